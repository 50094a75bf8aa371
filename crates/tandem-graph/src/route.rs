//! Routing after a reasoning step.

use crate::definition::{Next, TOOLS_NODE};
use tandem_contract::{Message, Role};

/// Decide the successor of the reasoning node.
///
/// Looks only at the last message: an assistant message carrying a non-empty
/// tool-call list routes to the tool node, anything else terminates the run.
/// Total and side-effect-free; never inspects earlier messages.
pub fn route(messages: &[Message]) -> Next {
    let Some(last) = messages.last() else {
        return Next::End;
    };
    if last.role == Role::Assistant && !last.tool_calls().is_empty() {
        return Next::Node(TOOLS_NODE);
    }
    Next::End
}
