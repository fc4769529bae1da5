// Consistent exit codes for the folio CLI.
//
//   0  = success
//   1  = general error
//   2  = usage error (unknown chapter, idea or project; no idea selected)
//   11 = the provider rejected the API key
//   12 = the chapter or project is busy with another operation
//   13 = rate limited or network failure

use std::process;

use folio_studio::engine::WorkbenchError;
use folio_studio::generation::GenerationError;

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    Auth = 11,
    Busy = 12,
    Network = 13,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(workbench_err) = cause.downcast_ref::<WorkbenchError>() {
                return Self::from_workbench_error(workbench_err);
            }
            if let Some(generation_err) = cause.downcast_ref::<GenerationError>() {
                return Self::from_generation_error(generation_err);
            }
        }
        Self::Error
    }

    fn from_workbench_error(err: &WorkbenchError) -> Self {
        match err {
            WorkbenchError::Busy { .. } => Self::Busy,
            WorkbenchError::UnknownChapter(_)
            | WorkbenchError::UnknownIdea(_)
            | WorkbenchError::UnknownProject(_)
            | WorkbenchError::NoIdea
            | WorkbenchError::Connection(_)
            | WorkbenchError::Import(_) => Self::Usage,
            WorkbenchError::Generation(generation_err) => {
                Self::from_generation_error(generation_err)
            }
            WorkbenchError::Storage(_) => Self::Error,
        }
    }

    fn from_generation_error(err: &GenerationError) -> Self {
        match err {
            GenerationError::RateLimited => Self::Network,
            GenerationError::InvalidCredentials => Self::Auth,
            GenerationError::Failure(_) => Self::Error,
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}
