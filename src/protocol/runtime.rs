use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use frameoxide_types::{Command, Method};

use crate::protocol::{ExecutionContextId, GlobalId, WorkerId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventExecutionContextCreated {
    pub execution_context_id: GlobalId,
    #[serde(default)]
    pub aux_data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventExecutionContextDestroyed {
    pub execution_context_id: GlobalId,
}

/// Where a console message originated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleLocation {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub line_number: i64,
    #[serde(default)]
    pub column_number: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventConsole {
    pub execution_context_id: GlobalId,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub location: ConsoleLocation,
}

/// Execution contexts of workers keep their local ids, commands reach them
/// through `Page.sendMessageToWorker`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWorkerExecutionContextCreated {
    pub worker_id: WorkerId,
    pub execution_context_id: ExecutionContextId,
    #[serde(default)]
    pub aux_data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWorkerExecutionContextDestroyed {
    pub worker_id: WorkerId,
    pub execution_context_id: ExecutionContextId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWorkerConsole {
    pub worker_id: WorkerId,
    pub execution_context_id: ExecutionContextId,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub location: ConsoleLocation,
}

/// The outcome of an evaluation inside a content process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateReturns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_details: Option<Value>,
}

/// Evaluates an expression in the execution context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateParams {
    pub execution_context_id: GlobalId,
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
}

impl EvaluateParams {
    pub fn new(execution_context_id: impl Into<GlobalId>, expression: impl Into<String>) -> Self {
        Self {
            execution_context_id: execution_context_id.into(),
            expression: expression.into(),
            return_by_value: None,
        }
    }

    pub fn return_by_value(mut self, return_by_value: bool) -> Self {
        self.return_by_value = Some(return_by_value);
        self
    }
}

impl Method for EvaluateParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Runtime.evaluate".into()
    }
}

impl Command for EvaluateParams {
    type Response = EvaluateReturns;
}

/// Calls a function declaration with the given arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFunctionParams {
    pub execution_context_id: GlobalId,
    pub function_declaration: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
}

impl CallFunctionParams {
    pub fn new(
        execution_context_id: impl Into<GlobalId>,
        function_declaration: impl Into<String>,
    ) -> Self {
        Self {
            execution_context_id: execution_context_id.into(),
            function_declaration: function_declaration.into(),
            args: Vec::new(),
            return_by_value: None,
        }
    }

    pub fn arg(mut self, arg: Value) -> Self {
        self.args.push(arg);
        self
    }

    pub fn return_by_value(mut self, return_by_value: bool) -> Self {
        self.return_by_value = Some(return_by_value);
        self
    }
}

impl Method for CallFunctionParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Runtime.callFunction".into()
    }
}

impl Command for CallFunctionParams {
    type Response = EvaluateReturns;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetObjectPropertiesParams {
    pub execution_context_id: GlobalId,
    pub object_id: String,
}

impl GetObjectPropertiesParams {
    pub fn new(execution_context_id: impl Into<GlobalId>, object_id: impl Into<String>) -> Self {
        Self {
            execution_context_id: execution_context_id.into(),
            object_id: object_id.into(),
        }
    }
}

impl Method for GetObjectPropertiesParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Runtime.getObjectProperties".into()
    }
}

impl Command for GetObjectPropertiesParams {
    type Response = GetObjectPropertiesReturns;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetObjectPropertiesReturns {
    #[serde(default)]
    pub properties: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisposeObjectParams {
    pub execution_context_id: GlobalId,
    pub object_id: String,
}

impl DisposeObjectParams {
    pub fn new(execution_context_id: impl Into<GlobalId>, object_id: impl Into<String>) -> Self {
        Self {
            execution_context_id: execution_context_id.into(),
            object_id: object_id.into(),
        }
    }
}

impl Method for DisposeObjectParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Runtime.disposeObject".into()
    }
}

impl Command for DisposeObjectParams {
    type Response = DisposeObjectReturns;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisposeObjectReturns {}
