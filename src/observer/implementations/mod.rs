// Observer implementations organized by rings
// Each ring handles one step of the mutation contract

use crate::observer::pipeline::MutationPipeline;
use crate::observer::traits::ObserverBox;

// Ring 0: Resolve - arguments, target, references, ownership
#[path = "0/parse_arguments.rs"]
pub mod parse_arguments;
#[path = "0/load_target.rs"]
pub mod load_target;
#[path = "0/resolve_references.rs"]
pub mod resolve_references;
#[path = "0/resolve_ownership.rs"]
pub mod resolve_ownership;

// Ring 1: Authorize
#[path = "1/authorization_check.rs"]
pub mod authorization_check;

// Ring 2: Apply - candidate record
#[path = "2/apply_changes.rs"]
pub mod apply_changes;
#[path = "2/derive_fields.rs"]
pub mod derive_fields;
#[path = "2/stamp_read_at.rs"]
pub mod stamp_read_at;

// Ring 3: Validate
#[path = "3/field_constraints.rs"]
pub mod field_constraints;
#[path = "3/relational_rules.rs"]
pub mod relational_rules;
#[path = "3/unique_fields.rs"]
pub mod unique_fields;
#[path = "3/password_policy.rs"]
pub mod password_policy;

// Ring 4: Persist
#[path = "4/hash_credentials.rs"]
pub mod hash_credentials;
#[path = "4/write_record.rs"]
pub mod write_record;

// Ring 5: Audit (post-commit)
#[path = "5/audit_log.rs"]
pub mod audit_log;

pub use apply_changes::ApplyChanges;
pub use audit_log::AuditLog;
pub use authorization_check::AuthorizationCheck;
pub use derive_fields::DeriveFields;
pub use field_constraints::FieldConstraints;
pub use hash_credentials::HashCredentials;
pub use load_target::LoadTarget;
pub use parse_arguments::ParseArguments;
pub use password_policy::PasswordPolicy;
pub use relational_rules::RelationalRules;
pub use resolve_ownership::ResolveOwnership;
pub use resolve_references::ResolveReferences;
pub use stamp_read_at::StampReadAt;
pub use unique_fields::UniqueFields;
pub use write_record::WriteRecord;

/// Register every observer the mutation contract needs
pub fn register_default_observers(pipeline: &mut MutationPipeline) {
    pipeline.register_observer(ObserverBox::Resolve(Box::new(ParseArguments)));
    pipeline.register_observer(ObserverBox::Resolve(Box::new(LoadTarget)));
    pipeline.register_observer(ObserverBox::Resolve(Box::new(ResolveReferences)));
    pipeline.register_observer(ObserverBox::Resolve(Box::new(ResolveOwnership)));

    pipeline.register_observer(ObserverBox::Authorize(Box::new(AuthorizationCheck)));

    pipeline.register_observer(ObserverBox::Apply(Box::new(ApplyChanges)));
    pipeline.register_observer(ObserverBox::Apply(Box::new(DeriveFields)));
    pipeline.register_observer(ObserverBox::Apply(Box::new(StampReadAt)));

    pipeline.register_observer(ObserverBox::Validate(Box::new(FieldConstraints)));
    pipeline.register_observer(ObserverBox::Validate(Box::new(RelationalRules)));
    pipeline.register_observer(ObserverBox::Validate(Box::new(UniqueFields)));
    pipeline.register_observer(ObserverBox::Validate(Box::new(PasswordPolicy)));

    pipeline.register_observer(ObserverBox::Persist(Box::new(HashCredentials)));
    pipeline.register_observer(ObserverBox::Persist(Box::new(WriteRecord)));

    pipeline.register_observer(ObserverBox::Audit(Box::new(AuditLog)));
}
