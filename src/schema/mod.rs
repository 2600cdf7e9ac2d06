// Entity schema tables
//
// Every entity is described once by an `EntitySchema`: its fields (with the typed
// coercion used for argument bags), declared defaults, ownership path and
// cross-field rules. The pipeline, validation layer and stores are all driven
// from these tables rather than from per-entity code.

pub mod entities;
pub mod field;

pub use field::{CoerceError, FieldDef, FieldDefault, FieldKind};

use serde::{Deserialize, Serialize};

/// Entity types of the project-management domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Account,
    Cleiton,
    Project,
    Activity,
    Task,
    Document,
    Report,
    Notification,
    Event,
    Message,
}

impl EntityKind {
    pub const ALL: [EntityKind; 10] = [
        EntityKind::Account,
        EntityKind::Cleiton,
        EntityKind::Project,
        EntityKind::Activity,
        EntityKind::Task,
        EntityKind::Document,
        EntityKind::Report,
        EntityKind::Notification,
        EntityKind::Event,
        EntityKind::Message,
    ];

    /// Type name as used in mutation names and opaque ids ("Project")
    pub fn type_name(&self) -> &'static str {
        match self {
            EntityKind::Account => "Account",
            EntityKind::Cleiton => "Cleiton",
            EntityKind::Project => "Project",
            EntityKind::Activity => "Activity",
            EntityKind::Task => "Task",
            EntityKind::Document => "Document",
            EntityKind::Report => "Report",
            EntityKind::Notification => "Notification",
            EntityKind::Event => "Event",
            EntityKind::Message => "Message",
        }
    }

    /// Storage table name
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Account => "accounts",
            EntityKind::Cleiton => "cleitons",
            EntityKind::Project => "projects",
            EntityKind::Activity => "activities",
            EntityKind::Task => "tasks",
            EntityKind::Document => "documents",
            EntityKind::Report => "reports",
            EntityKind::Notification => "notifications",
            EntityKind::Event => "events",
            EntityKind::Message => "messages",
        }
    }

    /// Field name carrying the entity in a result envelope ("project")
    pub fn field_name(&self) -> &'static str {
        match self {
            EntityKind::Account => "account",
            EntityKind::Cleiton => "cleiton",
            EntityKind::Project => "project",
            EntityKind::Activity => "activity",
            EntityKind::Task => "task",
            EntityKind::Document => "document",
            EntityKind::Report => "report",
            EntityKind::Notification => "notification",
            EntityKind::Event => "event",
            EntityKind::Message => "message",
        }
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_name() == name)
    }

    pub fn from_table(table: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.table() == table)
    }

    /// Schema table for this entity
    pub fn schema(&self) -> &'static EntitySchema {
        entities::schema_for(*self)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

/// How an entity reaches the Account that owns it
#[derive(Debug, Clone, Copy)]
pub enum OwnerPath {
    /// The entity is itself the owning account
    Itself,
    /// The owning account id is stored directly in this field
    Field(&'static str),
    /// Ownership is inherited from the first non-null reference among these fields
    Parent(&'static [&'static str]),
}

/// Rules spanning more than one field
#[derive(Debug, Clone, Copy)]
pub enum CrossFieldRule {
    /// Exactly one of the fields must be non-null
    ExactlyOne {
        fields: &'static [&'static str],
        message: &'static str,
    },
    /// `later` must not sort before `earlier` (dates and timestamps)
    NotBefore {
        earlier: &'static str,
        later: &'static str,
        message: &'static str,
    },
    /// The record referenced by `child` must point at the same `parent` as this record
    SameParent {
        child: &'static str,
        parent: &'static str,
        message: &'static str,
    },
    /// Whichever of `subjects` is set must descend from the client in `client`
    SubjectOfClient {
        subjects: &'static [&'static str],
        client: &'static str,
        message: &'static str,
    },
}

impl CrossFieldRule {
    /// Rules that can be evaluated on the candidate alone, without store lookups
    pub fn is_local(&self) -> bool {
        matches!(self, CrossFieldRule::ExactlyOne { .. } | CrossFieldRule::NotBefore { .. })
    }
}

/// Declarative description of one entity
#[derive(Debug)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub fields: Vec<FieldDef>,
    pub owner: OwnerPath,
    pub rules: Vec<CrossFieldRule>,
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Fields holding foreign keys, with the entity they point at
    pub fn references(&self) -> impl Iterator<Item = (&FieldDef, EntityKind)> {
        self.fields.iter().filter_map(|field| match field.kind {
            FieldKind::Reference(target) => Some((field, target)),
            _ => None,
        })
    }

    /// Fields that must never leave the API
    pub fn secret_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|field| matches!(field.kind, FieldKind::Secret))
    }

    /// Column names in declaration order, `id` first
    pub fn columns(&self) -> Vec<&'static str> {
        std::iter::once("id")
            .chain(self.fields.iter().map(|field| field.name))
            .collect()
    }
}
