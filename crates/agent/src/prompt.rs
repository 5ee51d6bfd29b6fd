//! Prompt assembly for the helpdesk flows.
//!
//! Everything here is a pure function of its inputs. Templates use
//! `{placeholder}` substitution; the document Q&A flow is retrieval-free, so
//! the entire document is inlined verbatim rather than chunked or indexed.

use savor_core::{Menu, Message, OrderHistory};

/// Substitute `{key}` placeholders. Unknown placeholders are left intact so a
/// template typo shows up in the prompt instead of silently vanishing.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (key, value) in vars {
        rendered = rendered.replace(&format!("{{{key}}}"), value);
    }
    rendered
}

/// Build the conversation for one completion call: system instruction,
/// optional context block, history turns in original order, the latest user
/// message last. An empty context omits its section entirely rather than
/// emitting a placeholder block.
pub fn assemble(
    system: &str,
    context: Option<&str>,
    history: &[Message],
    latest: &str,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(Message::system(system));
    if let Some(context) = context.filter(|block| !block.trim().is_empty()) {
        messages.push(Message::system(context));
    }
    messages.extend(history.iter().cloned());
    messages.push(Message::user(latest));
    messages
}

const RECOMMEND_SYSTEM: &str = "You are a dining recommendation assistant. Base your advice ONLY on the provided menu and purchase history. If information is insufficient, reply exactly with 「不知道」. Provide 2-3 bullet points with dish names and a short reason for each.\n[Hard rules]\n1) Write the final answer entirely in Traditional Chinese (zh-Hant) and in a warm, friendly tone; no English words or letters.\n2) Recommend only items that exist in the menu; never invent dishes.\n3) Respect the requested dining period; if a candidate does not fit, choose another.\n4) You may infer taste or allergen preferences from purchase history and explain briefly.";

const RECOMMEND_USER: &str = "[User need] {question}\n\n[Menu]\n{menu}\n\n[Purchase history] {history}\n\nWrite the final answer entirely in Traditional Chinese (zh-Hant) and in a warm, friendly tone; no English words or letters.";

/// Personalized recommendation: full menu plus the caller-owned order
/// baskets, both inlined verbatim.
pub fn recommendation_messages(
    question: &str,
    menu: &Menu,
    orders: &OrderHistory,
) -> Vec<Message> {
    let user = render(
        RECOMMEND_USER,
        &[
            ("question", question),
            ("menu", &menu.as_prompt_block()),
            ("history", &orders.as_prompt_block()),
        ],
    );
    assemble(RECOMMEND_SYSTEM, None, &[], &user)
}

const QA_SYSTEM: &str = "Answer strictly using ONLY the provided content. If the answer is not present, reply with 「不知道」. Respond in Traditional Chinese (zh-Hant).";

const QA_USER: &str =
    "Content:\n{context}\n---\nQuestion: {question}\nAnswer strictly using the content above.";

/// Retrieval-free Q&A over one knowledge document.
pub fn document_qa_messages(question: &str, document: &str) -> Vec<Message> {
    let user = render(QA_USER, &[("context", document), ("question", question)]);
    assemble(QA_SYSTEM, None, &[], &user)
}

const SMALL_TALK_SYSTEM: &str = "You are a friendly assistant for a fast-food helpdesk. Answer in Traditional Chinese (Taiwanese usage). If you don't know the answer, say 「不知道」.";

/// Small talk keeps the prior turns so the model can follow the thread.
pub fn small_talk_messages(question: &str, history: &[Message]) -> Vec<Message> {
    assemble(SMALL_TALK_SYSTEM, None, history, question)
}

#[cfg(test)]
mod tests {
    use savor_core::{Menu, Message, OrderHistory, Role};

    use super::{assemble, document_qa_messages, recommendation_messages, render};

    #[test]
    fn render_substitutes_each_placeholder() {
        let rendered = render("Q: {question} / C: {context}", &[
            ("question", "幾點打烊？"),
            ("context", "營業到 22:00"),
        ]);
        assert_eq!(rendered, "Q: 幾點打烊？ / C: 營業到 22:00");
    }

    #[test]
    fn render_leaves_unknown_placeholders_intact() {
        assert_eq!(render("{question} {typo}", &[("question", "hi")]), "hi {typo}");
    }

    #[test]
    fn assemble_orders_system_history_then_latest() {
        let history = vec![Message::user("first"), Message::assistant("reply")];
        let messages = assemble("be helpful", None, &history, "second");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "first");
        assert_eq!(messages[2].content, "reply");
        assert_eq!(messages[3], Message::user("second"));
    }

    #[test]
    fn empty_context_section_is_omitted_entirely() {
        let with_blank = assemble("sys", Some("   \n"), &[], "q");
        let without = assemble("sys", None, &[], "q");
        assert_eq!(with_blank, without);
        assert_eq!(with_blank.len(), 2);
    }

    #[test]
    fn non_empty_context_becomes_second_system_message() {
        let messages = assemble("sys", Some("the menu"), &[], "q");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], Message::system("the menu"));
    }

    #[test]
    fn recommendation_prompt_inlines_baskets_verbatim() {
        let menu = Menu::parse_csv("經典牛肉堡,120,主餐\n田園沙拉,80,點心\n").expect("menu");
        let orders = OrderHistory(vec![
            vec!["Burger".to_string(), "Fries".to_string()],
            vec!["Salad".to_string()],
        ]);

        let messages = recommendation_messages("Recommend something", &menu, &orders);
        let user_turn = &messages.last().expect("latest turn").content;

        assert!(user_turn.contains("Burger"));
        assert!(user_turn.contains("Fries"));
        assert!(user_turn.contains("Salad"));
        assert!(user_turn.contains("經典牛肉堡,120,主餐"));
    }

    #[test]
    fn document_qa_inlines_the_whole_document() {
        let document = "台北門市：台北市信義路 1 號，營業 10:00-22:00。";
        let messages = document_qa_messages("What's your address?", document);
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains(document));
        assert!(messages[1].content.contains("What's your address?"));
    }
}
