pub mod assembly;
pub mod driver;
pub mod error;
pub mod executor;
pub mod status;
pub mod translator;
pub mod unused;

pub use assembly::{AssemblyContext, LanguageLineMods};
pub use driver::{CommandOutput, ExecutionDriver};
pub use error::{EntityError, InternalError, TestFailure};
pub use executor::run_document;
pub use status::{DocumentReport, LogEvent, StatusCounts, Warning};
