use std::fmt;

/// An absorbed anomaly met while processing a document.
///
/// Each is logged at error level when reported and the conversion goes on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    NoWorkerFound { tag: String },
    NoCssApplierFound { tag: String },
    WorkerUnableToProcessOtherWorker { parent: String, child: String },
    WorkerUnableToProcessContent { worker: String },
    NoConsumerFoundForContent,
    TextWasNotProcessed { text: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NoWorkerFound { tag } => write!(f, "no worker found for <{tag}>"),
            Diagnostic::NoCssApplierFound { tag } => {
                write!(f, "no css applier found for <{tag}>")
            }
            Diagnostic::WorkerUnableToProcessOtherWorker { parent, child } => {
                write!(f, "worker {parent} is unable to process {child}")
            }
            Diagnostic::WorkerUnableToProcessContent { worker } => {
                write!(f, "worker {worker} is unable to process text content")
            }
            Diagnostic::NoConsumerFoundForContent => f.write_str("no consumer found for content"),
            Diagnostic::TextWasNotProcessed { text } => {
                write!(f, "text was not processed: {text:?}")
            }
        }
    }
}
