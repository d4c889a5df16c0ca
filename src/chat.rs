// One question/answer turn: backend call, decode, chart, history

use tracing::{debug, warn};

use crate::client::{Backend, ChatRequest};
use crate::compiler::build_chart;
use crate::config::{ChartConfig, SeriesSpec};
use crate::data::Table;
use crate::error::ConfigError;
use crate::ir::ChartSpec;
use crate::response::ChatResponse;
use crate::session::{ChatSession, Role};
use crate::settings::FallbackChart;

/// Everything shown for one assistant reply
#[derive(Debug)]
pub struct Turn {
    pub answer: String,
    pub table: Option<Table>,
    /// `None` when there is nothing to chart; `Some(Err)` when the config
    /// could not be applied. The answer is shown either way.
    pub chart: Option<Result<ChartSpec, ConfigError>>,
}

/// Ask `question` for `customer_id`, recording both sides in `session`.
///
/// Backend failures become the answer text; they never roll back history.
pub fn ask<B: Backend + ?Sized>(
    session: &mut ChatSession,
    backend: &B,
    customer_id: &str,
    question: &str,
    fallback: Option<&FallbackChart>,
) -> Turn {
    session.push(Role::User, question);

    let request = ChatRequest {
        chat_id: session.chat_id().to_string(),
        customer_id: customer_id.to_string(),
        message: question.to_string(),
    };

    let turn = match backend.chat(&request) {
        Ok(reply) => {
            session.adopt_chat_id(reply.chat_id());
            turn_from_reply(&reply, fallback)
        }
        Err(e) => {
            warn!(error = %e, "question failed");
            Turn {
                answer: format!("❌ Error: {}", e),
                table: None,
                chart: None,
            }
        }
    };

    session.push(Role::Assistant, turn.answer.clone());
    turn
}

/// Build the displayable turn from a decoded backend reply
pub fn turn_from_reply(reply: &ChatResponse, fallback: Option<&FallbackChart>) -> Turn {
    let answer = reply.answer();

    let table = match reply.rows() {
        Ok(table) => Some(table),
        Err(e) => {
            debug!(reason = %e, "reply content is not tabular");
            None
        }
    };

    let chart = table.as_ref().and_then(|table| {
        let chart = match reply.chart_config() {
            Some(config) => Some(config.and_then(|cfg| build_chart(table, &cfg))),
            None => fallback_chart(table, fallback),
        };
        if let Some(Err(e)) = &chart {
            warn!(error = %e, "chart could not be built");
        }
        chart
    });

    Turn {
        answer,
        table,
        chart,
    }
}

/// Plain bar chart over the fallback columns, when the table has both
fn fallback_chart(
    table: &Table,
    fallback: Option<&FallbackChart>,
) -> Option<Result<ChartSpec, ConfigError>> {
    let fb = fallback?;
    if !(table.has_column(&fb.label_column) && table.has_column(&fb.value_column)) {
        return None;
    }
    let config = ChartConfig::new(
        "bar",
        vec![SeriesSpec::new(&fb.label_column, &fb.value_column, &fb.value_column)],
    );
    Some(build_chart(table, &config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::ir::Mark;
    use crate::session::Message;
    use serde_json::json;
    use std::cell::RefCell;

    /// Replays canned replies and records the requests it saw
    struct StubBackend {
        replies: RefCell<Vec<Result<ChatResponse, BackendError>>>,
        seen: RefCell<Vec<ChatRequest>>,
    }

    impl StubBackend {
        fn new(mut replies: Vec<Result<ChatResponse, BackendError>>) -> Self {
            replies.reverse();
            Self {
                replies: RefCell::new(replies),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Backend for StubBackend {
        fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError> {
            self.seen.borrow_mut().push(request.clone());
            self.replies.borrow_mut().pop().unwrap_or(Err(BackendError::Envelope {
                reason: "no canned reply".to_string(),
            }))
        }
    }

    fn tabular_reply(chat_id: &str) -> ChatResponse {
        ChatResponse::from_json(json!({
            "content": "[{\"Region\":\"N\",\"Units\":10},{\"Region\":\"S\",\"Units\":20}]",
            "chart_config": {
                "chart_type": "bar",
                "series": [{"label_column": "Region", "value_column": "Units", "series_name": "s1"}]
            },
            "summarized_output": "Units by region.",
            "chat_id": chat_id
        }))
        .unwrap()
    }

    #[test]
    fn test_successful_turn() {
        let backend = StubBackend::new(vec![Ok(tabular_reply("c-1")), Ok(tabular_reply(""))]);
        let mut session = ChatSession::new();

        let turn = ask(&mut session, &backend, "cust-9", "Units by region?", None);
        assert_eq!(turn.answer, "Units by region.");
        assert_eq!(turn.table.as_ref().unwrap().len(), 2);
        let chart = turn.chart.unwrap().unwrap();
        assert_eq!(chart.mark, Mark::Bar);
        assert_eq!(session.chat_id(), "c-1");

        // Second question carries the chat id; empty id in reply keeps it
        ask(&mut session, &backend, "cust-9", "And again?", None);
        let seen = backend.seen.borrow();
        assert_eq!(seen[0].chat_id, "");
        assert_eq!(seen[1].chat_id, "c-1");
        assert_eq!(seen[1].customer_id, "cust-9");
        assert_eq!(session.chat_id(), "c-1");
        assert_eq!(session.messages().len(), 4);
    }

    #[test]
    fn test_backend_failure_keeps_history() {
        let backend = StubBackend::new(vec![
            Ok(tabular_reply("c-1")),
            Err(BackendError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            }),
        ]);
        let mut session = ChatSession::new();
        ask(&mut session, &backend, "cust-9", "first", None);

        let turn = ask(&mut session, &backend, "cust-9", "second", None);
        assert_eq!(turn.answer, "❌ Error: backend returned 502: bad gateway");
        assert!(turn.table.is_none());
        assert!(turn.chart.is_none());
        assert_eq!(session.chat_id(), "c-1");
        assert_eq!(
            session.messages()[2..].to_vec(),
            vec![
                Message { role: Role::User, text: "second".to_string() },
                Message { role: Role::Assistant, text: turn.answer.clone() },
            ]
        );
    }

    #[test]
    fn test_bad_chart_config_keeps_answer() {
        let reply = ChatResponse::from_json(json!({
            "content": "[{\"Region\":\"N\",\"Units\":10}]",
            "chart_config": {
                "chart_type": "line",
                "series": [{"label_column": "Region", "value_column": "Profit", "series_name": "p"}]
            },
            "summarized_output": "One region."
        }))
        .unwrap();

        let turn = turn_from_reply(&reply, None);
        assert_eq!(turn.answer, "One region.");
        assert!(turn.table.is_some());
        assert!(matches!(
            turn.chart,
            Some(Err(ConfigError::MissingColumn { .. }))
        ));
    }

    #[test]
    fn test_plain_text_reply_has_no_table() {
        let reply = ChatResponse::from_json(json!({
            "content": "Nothing to tabulate.",
            "chart_config": {"chart_type": "bar", "series": []}
        }))
        .unwrap();

        let turn = turn_from_reply(&reply, Some(&FallbackChart::default()));
        assert_eq!(turn.answer, "Nothing to tabulate.");
        assert!(turn.table.is_none());
        assert!(turn.chart.is_none());
    }

    #[test]
    fn test_fallback_chart() {
        let reply = ChatResponse::from_json(json!({
            "content": "[{\"Document_Status\":\"Pending\",\"Employee_Count\":4},{\"Document_Status\":\"Done\",\"Employee_Count\":9}]"
        }))
        .unwrap();

        let turn = turn_from_reply(&reply, Some(&FallbackChart::default()));
        let chart = turn.chart.unwrap().unwrap();
        assert_eq!(chart.x_title(), Some("Document_Status"));
        assert_eq!(chart.y_title(), Some("Employee_Count"));

        let turn = turn_from_reply(&reply, None);
        assert!(turn.chart.is_none());
    }

    #[test]
    fn test_empty_chart_config_uses_fallback() {
        let reply = ChatResponse::from_json(json!({
            "content": "[{\"Document_Status\":\"Pending\",\"Employee_Count\":4}]",
            "chart_config": {}
        }))
        .unwrap();

        let turn = turn_from_reply(&reply, Some(&FallbackChart::default()));
        let chart = turn.chart.unwrap().unwrap();
        assert_eq!(chart.mark, Mark::Bar);
        assert!(!chart.is_placeholder());
    }
}
