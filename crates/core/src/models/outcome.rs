/// 一次后端调用的结果
///
/// 调用器从不向上抛出错误，传输层失败也折算为 [`CallOutcome::Failed`]。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// 收到HTTP响应（任意状态码）
    Response { status: u16, body: String },
    /// 连接失败、超时、读取响应体失败或未被执行器接纳
    Failed(String),
}

impl CallOutcome {
    pub fn response(status: u16, body: impl Into<String>) -> Self {
        CallOutcome::Response {
            status,
            body: body.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        CallOutcome::Failed(reason.into())
    }

    /// 是否为2xx响应
    pub fn is_success_status(&self) -> bool {
        matches!(self, CallOutcome::Response { status, .. } if status / 100 == 2)
    }
}
