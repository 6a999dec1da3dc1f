//! Tool descriptors advertised at `GET /tools/list`

use serde_json::json;
use swissknife_protocol::{ToolDescriptor, HEALTH_PATH};

pub const SHELL_EXEC_PATH: &str = "/shell/exec";
pub const PROCESS_START_PATH: &str = "/process/start";
pub const PROCESS_STATUS_PATH: &str = "/process/status";
pub const PROCESS_KILL_PATH: &str = "/process/kill";
pub const PROCESS_READ_PATH: &str = "/process/read";
pub const PROCESS_LIST_PATH: &str = "/process/list";

fn env_schema() -> serde_json::Value {
    json!({
        "anyOf": [
            {"type": "object", "additionalProperties": {"type": "string"}},
            {"type": "null"}
        ]
    })
}

fn pid_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {"pid": {"type": "integer"}},
        "required": ["pid"]
    })
}

/// Every tool this server exposes, in a stable order
pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new("health", "GET", HEALTH_PATH).with_description("Health check"),
        ToolDescriptor::new("shell.exec", "POST", SHELL_EXEC_PATH)
            .with_description("Execute a shell command")
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "cmd": {"type": "string"},
                    "cwd": {"type": ["string", "null"]},
                    "env": env_schema(),
                    "timeout_s": {"type": "integer", "default": 60}
                },
                "required": ["cmd"]
            })),
        ToolDescriptor::new("process.start", "POST", PROCESS_START_PATH)
            .with_description("Start a process")
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "cmd": {"type": "string"},
                    "cwd": {"type": ["string", "null"]},
                    "env": env_schema(),
                    "capture_output": {"type": "boolean", "default": true}
                },
                "required": ["cmd"]
            })),
        ToolDescriptor::new("process.status", "POST", PROCESS_STATUS_PATH)
            .with_description("Process status")
            .with_schema(pid_schema()),
        ToolDescriptor::new("process.kill", "POST", PROCESS_KILL_PATH)
            .with_description("Kill a process started by the server")
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "pid": {"type": "integer"},
                    "force": {"type": "boolean", "default": false},
                    "timeout_s": {"type": "integer"}
                },
                "required": ["pid"]
            })),
        ToolDescriptor::new("process.read", "POST", PROCESS_READ_PATH)
            .with_description("Read process output")
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "pid": {"type": "integer"},
                    "stream": {"type": "string", "enum": ["stdout", "stderr"], "default": "stdout"},
                    "max_bytes": {"type": "integer", "default": 20000},
                    "tail": {"type": "boolean", "default": true}
                },
                "required": ["pid"]
            })),
        ToolDescriptor::new("process.list", "POST", PROCESS_LIST_PATH)
            .with_description("List server-started processes"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_unique() {
        let tools = descriptors();
        let names: HashSet<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), tools.len());
    }

    #[test]
    fn test_only_health_is_reserved() {
        let reserved: Vec<_> = descriptors()
            .into_iter()
            .filter(|t| t.is_reserved())
            .map(|t| t.name)
            .collect();
        assert_eq!(reserved, vec!["health".to_string()]);
    }
}
