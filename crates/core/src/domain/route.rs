use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of intents a helpdesk message can be routed to.
///
/// The set is fixed at build time; the classifier model is asked to answer
/// with one of the canonical labels, and anything it produces that is not a
/// known label falls back to `Unhandled`. Model output is untrusted and must
/// never crash routing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Ordering,
    ProductInquiry,
    EventPromo,
    StoreLogistics,
    Recommendation,
    Greeting,
    Unhandled,
}

impl Route {
    pub const ALL: [Route; 7] = [
        Route::Ordering,
        Route::ProductInquiry,
        Route::EventPromo,
        Route::StoreLogistics,
        Route::Recommendation,
        Route::Greeting,
        Route::Unhandled,
    ];

    /// Canonical label the classifier is expected to emit.
    pub fn label(self) -> &'static str {
        match self {
            Route::Ordering => "Ordering",
            Route::ProductInquiry => "ProductInquiry",
            Route::EventPromo => "EventPromo",
            Route::StoreLogistics => "StoreLogistics",
            Route::Recommendation => "Recommendation",
            Route::Greeting => "Greeting",
            Route::Unhandled => "Unhandled",
        }
    }

    /// Map raw classifier output to a route.
    ///
    /// Matching is case-insensitive after trimming whitespace. Empty text,
    /// multiple labels, hallucinated labels, and free prose all map to
    /// `Unhandled`; this function cannot fail.
    pub fn parse_label(text: &str) -> Route {
        let normalized = text.trim().to_ascii_lowercase();
        Route::ALL
            .into_iter()
            .find(|route| route.label().to_ascii_lowercase() == normalized)
            .unwrap_or(Route::Unhandled)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::Route;

    #[test]
    fn every_canonical_label_round_trips() {
        for route in Route::ALL {
            assert_eq!(Route::parse_label(route.label()), route);
        }
    }

    #[test]
    fn matching_ignores_case_and_surrounding_whitespace() {
        assert_eq!(Route::parse_label("  storelogistics \n"), Route::StoreLogistics);
        assert_eq!(Route::parse_label("RECOMMENDATION"), Route::Recommendation);
        assert_eq!(Route::parse_label("ordering"), Route::Ordering);
    }

    #[test]
    fn unknown_output_falls_back_to_unhandled() {
        for raw in [
            "",
            "   ",
            "8",
            "Ordering Recommendation",
            "I think this is about the menu.",
            "FoodOrdering",
        ] {
            assert_eq!(Route::parse_label(raw), Route::Unhandled, "raw output: {raw:?}");
        }
    }
}
