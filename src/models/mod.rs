pub mod aesthetics;
pub mod appointment;
pub mod clinical_note;
pub mod compliance;
pub mod enums;
pub mod lab;
pub mod medication;
pub mod organization;
pub mod patient;
pub mod record;
pub mod timeline;
pub mod treatment_plan;
pub mod user;

pub use aesthetics::*;
pub use appointment::*;
pub use clinical_note::*;
pub use compliance::*;
pub use lab::*;
pub use medication::*;
pub use organization::*;
pub use patient::*;
pub use record::*;
pub use timeline::*;
pub use treatment_plan::*;
pub use user::*;
