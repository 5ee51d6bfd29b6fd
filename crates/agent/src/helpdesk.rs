//! Per-route dispatch: every route ends in the same shape, a lazy fragment
//! stream, so downstream components never branch on which route produced it.

use std::sync::Arc;

use savor_core::{Menu, MenuItem, Message, OrderHistory, Route};

use crate::backend::{BackendError, CompletionBackend, FragmentStream};
use crate::prompt;
use crate::router::{IntentRouter, RouterPrompt};

const BUILTIN_MENU_CSV: &str = "\
name,price,category
經典牛肉堡,120,主餐
辣味雞腿堡,110,主餐
海洋鱈魚堡,105,主餐
薯條(中),45,點心
雞塊(6塊),60,點心
田園沙拉,80,點心
可樂(小),35,飲料
冰紅茶(中),30,飲料
玉米濃湯,50,湯品
";

const BUILTIN_ORDERING_DOC: &str = "點餐方式：門市櫃檯、自助點餐機、官方 App 與外送平台皆可點餐。\
外送範圍為門市周邊三公里，滿 200 元免外送費。\
取消或修改訂單請於備餐前透過 App 或來電門市辦理；已開始備餐的訂單無法取消。\
付款方式支援現金、信用卡與行動支付。";

const BUILTIN_PROMO_DOC: &str = "本月活動：週一會員日主餐第二件半價；加入會員即贈中薯兌換券一張。\
學生憑證件消費滿 150 元送小杯飲料。優惠券每筆訂單限用一張，不可與其他優惠併用。\
會員點數每 50 元累積 1 點，滿 20 點可折抵 20 元。";

const BUILTIN_STORE_DOC: &str = "台北信義門市：台北市信義路五段 7 號，營業時間 10:00-22:00，電話 02-2345-6789，備有地下停車場。\
台北車站門市:台北市北平西路 3 號，營業時間 09:00-21:30，無停車位。\
內湖門市：台北市內湖區成功路四段 30 號，營業時間 10:30-21:00，提供外送服務。";

const BUILTIN_FALLBACK_REPLY: &str =
    "抱歉，這個問題超出我的服務範圍。我可以協助點餐、餐點資訊、優惠活動、門市資訊與餐點推薦，歡迎再描述一次您的需求。";

/// Read-only knowledge every session shares: the menu, the caller-owned
/// order baskets, and one document per topical route. All of it is inlined
/// verbatim into prompts (retrieval-free).
#[derive(Clone, Debug)]
pub struct Knowledge {
    pub menu: Menu,
    pub orders: OrderHistory,
    pub ordering_doc: String,
    pub promo_doc: String,
    pub store_doc: String,
    pub fallback_reply: String,
}

impl Knowledge {
    /// Embedded defaults so the server runs without any data files on disk.
    pub fn builtin() -> Self {
        let menu = Menu::parse_csv(BUILTIN_MENU_CSV)
            .unwrap_or_else(|_| Menu::new(builtin_menu_rows()));

        Self {
            menu,
            orders: OrderHistory::default(),
            ordering_doc: BUILTIN_ORDERING_DOC.to_string(),
            promo_doc: BUILTIN_PROMO_DOC.to_string(),
            store_doc: BUILTIN_STORE_DOC.to_string(),
            fallback_reply: BUILTIN_FALLBACK_REPLY.to_string(),
        }
    }
}

// Fallback rows in case the embedded CSV is ever edited into an unparseable
// state; keeps `builtin()` total.
fn builtin_menu_rows() -> Vec<MenuItem> {
    vec![MenuItem {
        name: "經典牛肉堡".to_string(),
        price: "120".to_string(),
        category: "主餐".to_string(),
    }]
}

/// Route a question and produce its answer stream.
pub struct Helpdesk {
    router: IntentRouter,
    backend: Arc<dyn CompletionBackend>,
    knowledge: Knowledge,
}

impl Helpdesk {
    pub fn new(backend: Arc<dyn CompletionBackend>, knowledge: Knowledge) -> Self {
        Self {
            router: IntentRouter::new(backend.clone(), RouterPrompt::default()),
            backend,
            knowledge,
        }
    }

    pub fn knowledge(&self) -> &Knowledge {
        &self.knowledge
    }

    /// Classify, then answer. Whatever the route, the caller gets back a lazy
    /// fragment stream; canned replies are a one-fragment stream.
    pub async fn respond(
        &self,
        query: &str,
        chat_history: &[Message],
    ) -> Result<(Route, FragmentStream), BackendError> {
        let route = self.router.classify(query).await?;

        let stream = match route {
            Route::Recommendation => {
                let messages = prompt::recommendation_messages(
                    query,
                    &self.knowledge.menu,
                    &self.knowledge.orders,
                );
                self.backend.stream(&messages).await?
            }
            Route::Greeting => {
                let messages = prompt::small_talk_messages(query, chat_history);
                self.backend.stream(&messages).await?
            }
            Route::Ordering => self.document_answer(query, &self.knowledge.ordering_doc).await?,
            Route::EventPromo => self.document_answer(query, &self.knowledge.promo_doc).await?,
            Route::StoreLogistics => self.document_answer(query, &self.knowledge.store_doc).await?,
            Route::ProductInquiry => {
                // The menu block is the product document.
                let menu_block = self.knowledge.menu.as_prompt_block();
                self.document_answer(query, &menu_block).await?
            }
            Route::Unhandled => canned_stream(self.knowledge.fallback_reply.clone()),
        };

        Ok((route, stream))
    }

    async fn document_answer(
        &self,
        query: &str,
        document: &str,
    ) -> Result<FragmentStream, BackendError> {
        let messages = prompt::document_qa_messages(query, document);
        self.backend.stream(&messages).await
    }
}

fn canned_stream(reply: String) -> FragmentStream {
    Box::pin(futures::stream::iter([Ok(reply)]))
}
