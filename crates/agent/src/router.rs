//! Intent routing: one non-streamed completion call mapped to a fixed label.

use std::sync::Arc;

use savor_core::{Message, Route};
use tracing::debug;

use crate::backend::{BackendError, CompletionBackend};
use crate::prompt;

const CLASSIFIER_SYSTEM: &str = "You are the intent gate for a fast-food helpdesk. Read the customer message (it may be written in Chinese), then output exactly one route label from the list below, with no other text, punctuation, or explanation.\n[Routes]\nOrdering = place / pre-order / modify / cancel an order, delivery, checkout (clear ordering intent wins over ProductInquiry, EventPromo, StoreLogistics)\nProductInquiry = menu items at the product level: availability, price, size, ingredients, allergens, serving time\nEventPromo = coupons, discounts, promotions, membership, seasonal campaigns\nStoreLogistics = store locations, business hours, directions, delivery coverage, phone, parking\nRecommendation = the customer explicitly asks what to eat or for a recommendation based on taste, budget, restrictions, or history\nGreeting = greetings and small talk with no concrete service request\nUnhandled = off-topic or unclear messages";

/// Few-shot classification prompt: the fixed system scope plus exemplar
/// message/label pairs. Externally supplied constants; `Default` carries the
/// built-in set.
#[derive(Clone, Debug)]
pub struct RouterPrompt {
    pub system: String,
    pub exemplars: Vec<(String, Route)>,
}

impl Default for RouterPrompt {
    fn default() -> Self {
        let exemplars = [
            ("請幫我外送兩份經典牛肉堡到內湖，另外加一份薯條。", Route::Ordering),
            ("小杯可樂現在多少錢？", Route::ProductInquiry),
            ("本月是否有折扣碼或會員加碼活動？", Route::EventPromo),
            ("台北車站附近的門市今天營業到幾點？", Route::StoreLogistics),
            ("我不吃牛而且怕辣，預算兩百內，有沒有推薦？", Route::Recommendation),
            ("嗨你好！", Route::Greeting),
            ("你覺得最近股市會上漲嗎？", Route::Unhandled),
        ];

        Self {
            system: CLASSIFIER_SYSTEM.to_string(),
            exemplars: exemplars
                .into_iter()
                .map(|(text, route)| (text.to_string(), route))
                .collect(),
        }
    }
}

impl RouterPrompt {
    /// System scope, the exemplar turns, then the question as the final user
    /// message.
    pub fn messages(&self, question: &str) -> Vec<Message> {
        let mut exemplar_turns = Vec::with_capacity(self.exemplars.len() * 2);
        for (text, route) in &self.exemplars {
            exemplar_turns.push(Message::user(text.clone()));
            exemplar_turns.push(Message::assistant(route.label()));
        }
        prompt::assemble(&self.system, None, &exemplar_turns, question)
    }
}

/// Classification gate in front of every flow.
///
/// Single transition per request: unclassified in, exactly one `Route` out.
/// A backend fault is a hard error (the session reports it); an answer that
/// merely fails to match a label is recovered locally as `Unhandled`.
pub struct IntentRouter {
    backend: Arc<dyn CompletionBackend>,
    prompt: RouterPrompt,
}

impl IntentRouter {
    pub fn new(backend: Arc<dyn CompletionBackend>, prompt: RouterPrompt) -> Self {
        Self { backend, prompt }
    }

    pub async fn classify(&self, question: &str) -> Result<Route, BackendError> {
        let messages = self.prompt.messages(question);
        let raw = self.backend.complete(&messages).await?;
        let route = Route::parse_label(&raw);

        debug!(
            event_name = "helpdesk.router.classified",
            raw_label = %raw.trim(),
            route = %route,
            "classifier output parsed"
        );
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use savor_core::{Message, Role, Route};

    use super::{IntentRouter, RouterPrompt};
    use crate::backend::{BackendError, CompletionBackend, FragmentStream};

    struct FixedAnswer(String);

    #[async_trait]
    impl CompletionBackend for FixedAnswer {
        async fn complete(&self, _messages: &[Message]) -> Result<String, BackendError> {
            Ok(self.0.clone())
        }

        async fn stream(&self, _messages: &[Message]) -> Result<FragmentStream, BackendError> {
            Err(BackendError::Stream("not used by the router".to_string()))
        }
    }

    struct Unreachable;

    #[async_trait]
    impl CompletionBackend for Unreachable {
        async fn complete(&self, _messages: &[Message]) -> Result<String, BackendError> {
            Err(BackendError::Api { status: 503, detail: "backend down".to_string() })
        }

        async fn stream(&self, _messages: &[Message]) -> Result<FragmentStream, BackendError> {
            Err(BackendError::Api { status: 503, detail: "backend down".to_string() })
        }
    }

    #[tokio::test]
    async fn well_formed_label_maps_to_its_route() {
        let router = IntentRouter::new(
            Arc::new(FixedAnswer(" storelogistics \n".to_string())),
            RouterPrompt::default(),
        );
        let route = router.classify("What's your address?").await.expect("classify");
        assert_eq!(route, Route::StoreLogistics);
    }

    #[tokio::test]
    async fn unparseable_answer_falls_back_to_unhandled() {
        for raw in ["", "5", "Ordering or maybe EventPromo", "sure, happy to help"] {
            let router = IntentRouter::new(
                Arc::new(FixedAnswer(raw.to_string())),
                RouterPrompt::default(),
            );
            let route = router.classify("anything").await.expect("classify");
            assert_eq!(route, Route::Unhandled, "raw answer: {raw:?}");
        }
    }

    #[tokio::test]
    async fn backend_fault_propagates_as_error() {
        let router = IntentRouter::new(Arc::new(Unreachable), RouterPrompt::default());
        let error = router.classify("hello").await.unwrap_err();
        assert!(matches!(error, BackendError::Api { status: 503, .. }));
    }

    #[test]
    fn classification_prompt_ends_with_the_question() {
        let prompt = RouterPrompt::default();
        let messages = prompt.messages("幾點打烊？");

        assert_eq!(messages[0].role, Role::System);
        // one system turn + 7 exemplar pairs + the question
        assert_eq!(messages.len(), 1 + 7 * 2 + 1);
        assert_eq!(messages.last().map(|m| m.content.as_str()), Some("幾點打烊？"));
        // exemplar answers are canonical labels
        assert_eq!(messages[2].content, Route::Ordering.label());
    }
}
