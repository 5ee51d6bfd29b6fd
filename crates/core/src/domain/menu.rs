use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One menu row as read from the CSV source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub price: String,
    pub category: String,
}

/// The restaurant menu, read-only for the duration of a request.
///
/// File reading stays in the server bootstrap; this type only turns CSV text
/// into rows and rows back into the delimited block that gets inlined into
/// prompts verbatim (retrieval-free: the whole menu is always given, never a
/// chunked or indexed subset).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Menu {
    items: Vec<MenuItem>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MenuParseError {
    #[error("menu line {line} has {found} fields, expected name,price,category")]
    MalformedLine { line: usize, found: usize },
    #[error("menu source contained no item rows")]
    Empty,
}

impl Menu {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }

    /// Parse `name,price,category` CSV text. An optional header row (price
    /// field is not numeric) is skipped; blank lines are ignored.
    pub fn parse_csv(raw: &str) -> Result<Self, MenuParseError> {
        let mut items = Vec::new();

        for (index, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != 3 {
                return Err(MenuParseError::MalformedLine {
                    line: index + 1,
                    found: fields.len(),
                });
            }

            let looks_like_header =
                items.is_empty() && fields[1].parse::<f64>().is_err();
            if looks_like_header {
                continue;
            }

            items.push(MenuItem {
                name: fields[0].to_string(),
                price: fields[1].to_string(),
                category: fields[2].to_string(),
            });
        }

        if items.is_empty() {
            return Err(MenuParseError::Empty);
        }
        Ok(Self { items })
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Flatten to the delimited text block inlined into prompts.
    pub fn as_prompt_block(&self) -> String {
        let mut block = String::from("name,price,category\n");
        for item in &self.items {
            block.push_str(&item.name);
            block.push(',');
            block.push_str(&item.price);
            block.push(',');
            block.push_str(&item.category);
            block.push('\n');
        }
        block
    }
}

/// Prior order baskets, oldest first. Caller-supplied and never mutated by
/// the core; each basket is an ordered list of item names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHistory(pub Vec<Vec<String>>);

impl OrderHistory {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render baskets for prompt inlining, item names verbatim.
    pub fn as_prompt_block(&self) -> String {
        if self.0.is_empty() {
            return "(no prior orders)".to_string();
        }
        self.0
            .iter()
            .map(|basket| format!("[{}]", basket.join(", ")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::{Menu, MenuParseError, OrderHistory};

    const SAMPLE: &str = "name,price,category\n經典牛肉堡,120,主餐\n薯條(中),45,點心\n可樂(小),35,飲料\n";

    #[test]
    fn parses_rows_and_skips_header() {
        let menu = Menu::parse_csv(SAMPLE).expect("parse");
        assert_eq!(menu.len(), 3);
        assert_eq!(menu.items()[0].name, "經典牛肉堡");
        assert_eq!(menu.items()[0].price, "120");
        assert_eq!(menu.items()[2].category, "飲料");
    }

    #[test]
    fn parses_headerless_source() {
        let menu = Menu::parse_csv("田園沙拉,80,點心\n").expect("parse");
        assert_eq!(menu.len(), 1);
    }

    #[test]
    fn rejects_malformed_line_with_position() {
        let error = Menu::parse_csv("name,price,category\n經典牛肉堡,120\n").unwrap_err();
        assert_eq!(error, MenuParseError::MalformedLine { line: 2, found: 2 });
    }

    #[test]
    fn rejects_empty_source() {
        assert_eq!(Menu::parse_csv("\n  \n"), Err(MenuParseError::Empty));
    }

    #[test]
    fn prompt_block_round_trips_rows() {
        let menu = Menu::parse_csv(SAMPLE).expect("parse");
        let block = menu.as_prompt_block();
        assert!(block.contains("經典牛肉堡,120,主餐"));
        assert!(block.starts_with("name,price,category\n"));
    }

    #[test]
    fn order_history_block_keeps_item_names_verbatim() {
        let history = OrderHistory(vec![
            vec!["Burger".to_string(), "Fries".to_string()],
            vec!["Salad".to_string()],
        ]);
        assert_eq!(history.as_prompt_block(), "[Burger, Fries]; [Salad]");
    }

    #[test]
    fn empty_history_renders_placeholder() {
        assert_eq!(OrderHistory::default().as_prompt_block(), "(no prior orders)");
    }
}
