use crate::ir::DiagramKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("input is empty")]
    EmptyInput,
    #[error("no {kind} diagram elements found in input")]
    NoNodes { kind: DiagramKind },
}
