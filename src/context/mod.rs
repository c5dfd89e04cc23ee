//! Context domain: records, persistent registry, provisioning strategies and the
//! lifecycle service that ties them together.

pub mod layout;
pub mod provision;
pub mod service;
pub mod store;
pub mod template;
pub mod types;

pub use layout::StateLayout;
pub use provision::{provisioner_for, CloneProvisioner, CreateOptions, Provisioner, WorktreeProvisioner};
pub use service::{ContextService, CreateRequest};
pub use store::ContextStore;
pub use template::{Template, TemplateStore};
pub use types::{safe_dir_name, validate_name, Context, State, Strategy, MAX_NAME_LEN, STATE_VERSION};
