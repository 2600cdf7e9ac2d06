// Entity declarations: one schema per entity, declared once and shared by
// parsing, authorization, validation and storage.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use super::{CrossFieldRule, EntityKind, EntitySchema, FieldDef, FieldDefault, OwnerPath};

pub const PROJECT_STATUSES: &[&str] = &["open", "in_progress", "completed", "requires_attention", "on_hold"];
pub const ACTIVITY_PRIORITIES: &[&str] = &["high", "medium", "low"];
pub const ACTIVITY_STATUSES: &[&str] = &["pending", "in_progress", "completed", "requires_attention", "blocked"];

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username regex"));
static CPF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{11}$").expect("valid cpf regex"));
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?\d{8,15}$").expect("valid phone regex"));

static ACCOUNT: Lazy<EntitySchema> = Lazy::new(|| EntitySchema {
    kind: EntityKind::Account,
    fields: vec![
        FieldDef::pattern("username", &USERNAME_RE, "Enter a valid username. Letters, digits and @/./+/-/_ only.")
            .required()
            .unique()
            .lowercase()
            .max_len(150),
        FieldDef::email("email").required().unique(),
        FieldDef::secret("password").required().min_len(8),
        FieldDef::pattern("cpf", &CPF_RE, "CPF must contain exactly 11 digits.").unique(),
        FieldDef::pattern("phone_number", &PHONE_RE, "Enter a valid phone number."),
        FieldDef::boolean("is_superuser"),
        FieldDef::boolean("is_staff"),
        FieldDef::datetime("date_joined").server(FieldDefault::Now),
    ],
    owner: OwnerPath::Itself,
    rules: vec![],
});

static CLEITON: Lazy<EntitySchema> = Lazy::new(|| EntitySchema {
    kind: EntityKind::Cleiton,
    fields: vec![
        FieldDef::text("name").required().max_len(255),
        FieldDef::email("email").required().unique(),
        FieldDef::text("phone").max_len(20),
        FieldDef::text("address").max_len(255),
        FieldDef::reference("user_id", EntityKind::Account).default_to(FieldDefault::Principal),
    ],
    owner: OwnerPath::Field("user_id"),
    rules: vec![],
});

static PROJECT: Lazy<EntitySchema> = Lazy::new(|| EntitySchema {
    kind: EntityKind::Project,
    fields: vec![
        FieldDef::text("name").required().max_len(255),
        FieldDef::text("description").required(),
        FieldDef::reference("cleiton_id", EntityKind::Cleiton).required(),
        FieldDef::choice("status", PROJECT_STATUSES).default_value(json!("open")),
        FieldDef::date("start_date").required(),
        FieldDef::date("estimated_end_date").required(),
    ],
    owner: OwnerPath::Parent(&["cleiton_id"]),
    rules: vec![CrossFieldRule::NotBefore {
        earlier: "start_date",
        later: "estimated_end_date",
        message: "Estimated end date must not be before the start date.",
    }],
});

static ACTIVITY: Lazy<EntitySchema> = Lazy::new(|| EntitySchema {
    kind: EntityKind::Activity,
    fields: vec![
        FieldDef::text("name").required().max_len(255),
        FieldDef::text("description").required(),
        FieldDef::reference("project_id", EntityKind::Project).required(),
        FieldDef::choice("priority", ACTIVITY_PRIORITIES).default_value(json!("medium")),
        FieldDef::choice("status", ACTIVITY_STATUSES).default_value(json!("pending")),
        FieldDef::date("creation_date").server(FieldDefault::Today),
        FieldDef::date("expected_completion_date").required(),
        FieldDef::reference("created_by_id", EntityKind::Account).server(FieldDefault::Principal),
    ],
    owner: OwnerPath::Parent(&["project_id"]),
    rules: vec![],
});

static TASK: Lazy<EntitySchema> = Lazy::new(|| EntitySchema {
    kind: EntityKind::Task,
    fields: vec![
        FieldDef::text("title").required().max_len(255),
        FieldDef::text("description"),
        FieldDef::datetime("due_date").required(),
        FieldDef::boolean("completed"),
        FieldDef::reference("project_id", EntityKind::Project).required(),
        FieldDef::reference("activity_id", EntityKind::Activity),
    ],
    owner: OwnerPath::Parent(&["project_id"]),
    rules: vec![CrossFieldRule::SameParent {
        child: "activity_id",
        parent: "project_id",
        message: "Activity must belong to the task's project.",
    }],
});

static DOCUMENT: Lazy<EntitySchema> = Lazy::new(|| EntitySchema {
    kind: EntityKind::Document,
    fields: vec![
        FieldDef::text("name").required().max_len(255),
        FieldDef::text("file").required().max_len(255),
        FieldDef::datetime("uploaded_at").server(FieldDefault::Now),
        FieldDef::reference("project_id", EntityKind::Project).required(),
    ],
    owner: OwnerPath::Parent(&["project_id"]),
    rules: vec![],
});

static REPORT: Lazy<EntitySchema> = Lazy::new(|| EntitySchema {
    kind: EntityKind::Report,
    fields: vec![
        FieldDef::text("title").required().max_len(255),
        FieldDef::text("content").required(),
        FieldDef::datetime("generated_at").server(FieldDefault::Now),
        FieldDef::reference("project_id", EntityKind::Project).required(),
        FieldDef::reference("cleiton_id", EntityKind::Cleiton).server(FieldDefault::Derived {
            via: "project_id",
            field: "cleiton_id",
        }),
    ],
    owner: OwnerPath::Parent(&["project_id"]),
    rules: vec![],
});

const NOTIFICATION_SUBJECTS: &[&str] = &["project_id", "activity_id", "report_id", "task_id", "document_id"];

static NOTIFICATION: Lazy<EntitySchema> = Lazy::new(|| EntitySchema {
    kind: EntityKind::Notification,
    fields: vec![
        FieldDef::text("title").required().max_len(255),
        FieldDef::text("message").required(),
        FieldDef::datetime("created_at").server(FieldDefault::Now),
        FieldDef::boolean("read"),
        FieldDef::datetime("read_at"),
        FieldDef::reference("cleiton_id", EntityKind::Cleiton).required(),
        FieldDef::reference("project_id", EntityKind::Project),
        FieldDef::reference("activity_id", EntityKind::Activity),
        FieldDef::reference("report_id", EntityKind::Report),
        FieldDef::reference("task_id", EntityKind::Task),
        FieldDef::reference("document_id", EntityKind::Document),
    ],
    owner: OwnerPath::Parent(&["cleiton_id"]),
    rules: vec![
        CrossFieldRule::ExactlyOne {
            fields: NOTIFICATION_SUBJECTS,
            message: "A notification must be associated with exactly one entity.",
        },
        CrossFieldRule::SubjectOfClient {
            subjects: NOTIFICATION_SUBJECTS,
            client: "cleiton_id",
            message: "The notification subject must belong to the originating client.",
        },
    ],
});

static EVENT: Lazy<EntitySchema> = Lazy::new(|| EntitySchema {
    kind: EntityKind::Event,
    fields: vec![
        FieldDef::text("title").required().max_len(255),
        FieldDef::text("description"),
        FieldDef::datetime("start_time").required().not_past(),
        FieldDef::datetime("end_time").required(),
        FieldDef::reference("activity_id", EntityKind::Activity),
        FieldDef::reference("task_id", EntityKind::Task),
    ],
    owner: OwnerPath::Parent(&["activity_id", "task_id"]),
    rules: vec![
        CrossFieldRule::ExactlyOne {
            fields: &["activity_id", "task_id"],
            message: "An event must be associated with exactly one entity.",
        },
        CrossFieldRule::NotBefore {
            earlier: "start_time",
            later: "end_time",
            message: "End time must not be before the start time.",
        },
    ],
});

static MESSAGE: Lazy<EntitySchema> = Lazy::new(|| EntitySchema {
    kind: EntityKind::Message,
    fields: vec![
        FieldDef::reference("sender_id", EntityKind::Account)
            .required()
            .default_to(FieldDefault::Principal),
        FieldDef::reference("receiver_id", EntityKind::Account).required(),
        FieldDef::text("content").required(),
        FieldDef::datetime("sent_at").server(FieldDefault::Now),
    ],
    owner: OwnerPath::Field("sender_id"),
    rules: vec![],
});

pub fn schema_for(kind: EntityKind) -> &'static EntitySchema {
    match kind {
        EntityKind::Account => &ACCOUNT,
        EntityKind::Cleiton => &CLEITON,
        EntityKind::Project => &PROJECT,
        EntityKind::Activity => &ACTIVITY,
        EntityKind::Task => &TASK,
        EntityKind::Document => &DOCUMENT,
        EntityKind::Report => &REPORT,
        EntityKind::Notification => &NOTIFICATION,
        EntityKind::Event => &EVENT,
        EntityKind::Message => &MESSAGE,
    }
}
