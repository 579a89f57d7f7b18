pub mod coerce;
pub mod config;
pub mod descriptor;
pub mod element;
pub mod engine;
pub mod error;
pub mod executor;
pub mod extract;
pub mod matcher;
pub mod page;
pub mod profile;
pub mod report;
pub mod session;

pub use coerce::CoercedValue;
pub use config::{AliasTable, ExecConfig, MatchConfig};
pub use descriptor::{ChoiceOption, FieldDescriptor, FieldKind};
pub use engine::FillEngine;
pub use error::{Error, FieldError, Result};
pub use executor::{CancelHandle, Executor};
pub use extract::extract_fields;
pub use matcher::{build_plan, FillPlan, PlanAction, PlanEntry};
pub use page::Page;
pub use profile::{AttributePath, AttributeValue, Education, Experience, Profile, SemanticType};
pub use report::{FieldReport, FillOutcome, RunReport};
pub use session::{Session, SessionBuilder, SessionConfig};
