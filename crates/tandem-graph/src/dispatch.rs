//! Tool dispatch: concurrent fan-out with deterministic reassembly.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tandem_contract::{Tool, ToolCall, ToolResult};

/// Result of one tool call execution, still correlated to its request.
#[derive(Debug, Clone)]
pub struct ToolExecution {
    pub call: ToolCall,
    pub result: ToolResult,
}

/// Execute a single tool call.
///
/// All per-call failures are recovered locally as error-content results:
/// an unknown tool name, a schema violation (checked before invocation), or
/// a tool-level error never aborts sibling calls or the run.
pub async fn execute_single_tool(tool: Option<&dyn Tool>, call: &ToolCall) -> ToolExecution {
    let Some(tool) = tool else {
        return ToolExecution {
            call: call.clone(),
            result: ToolResult::error(&call.name, format!("Tool '{}' not found", call.name)),
        };
    };

    if let Err(e) = tool.validate_args(&call.arguments) {
        return ToolExecution {
            call: call.clone(),
            result: ToolResult::error(&call.name, e.to_string()),
        };
    }

    let result = match tool.execute(call.arguments.clone()).await {
        Ok(r) => r,
        Err(e) => ToolResult::error(&call.name, e.to_string()),
    };

    ToolExecution {
        call: call.clone(),
        result,
    }
}

/// Execute a batch of tool calls concurrently.
///
/// Results are positioned by request index, not completion time: the output
/// order always equals the request order regardless of per-call latency.
pub async fn execute_tools_parallel(
    tools: &HashMap<String, Arc<dyn Tool>>,
    calls: &[ToolCall],
) -> Vec<ToolExecution> {
    let tasks = calls.iter().map(|call| {
        let tool = tools.get(&call.name).cloned();
        async move { execute_single_tool(tool.as_deref(), call).await }
    });
    join_all(tasks).await
}

/// Helper to create a tool map from an iterator of tools.
pub fn tool_map<I, T>(tools: I) -> HashMap<String, Arc<dyn Tool>>
where
    I: IntoIterator<Item = T>,
    T: Tool + 'static,
{
    tools
        .into_iter()
        .map(|t| {
            let name = t.descriptor().id.clone();
            (name, Arc::new(t) as Arc<dyn Tool>)
        })
        .collect()
}

/// Helper to create a tool map from `Arc<dyn Tool>`.
pub fn tool_map_from_arc<I>(tools: I) -> HashMap<String, Arc<dyn Tool>>
where
    I: IntoIterator<Item = Arc<dyn Tool>>,
{
    tools
        .into_iter()
        .map(|t| (t.descriptor().id.clone(), t))
        .collect()
}
