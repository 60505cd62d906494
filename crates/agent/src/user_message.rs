//! Translation of internal failures into user-safe sentences.
//!
//! Raw provider or tool error text is never shown to the end user. The
//! message is matched by coarse substring against a small table that
//! depends on where the failure happened.

use agentchat_core::error::Error;

/// Fixed apology when the loop hits its iteration cap.
pub const ITERATION_LIMIT_APOLOGY: &str = "The request took too long to process. Please try breaking it into smaller questions or rephrasing your query.";

/// Where a failure surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorContext {
    /// A tool batch failed.
    Tool,
    /// The completion call (or anything else in the iteration) failed.
    Iteration,
}

impl ErrorContext {
    pub fn of(error: &Error) -> Self {
        match error {
            Error::Tool(_) => Self::Tool,
            _ => Self::Iteration,
        }
    }
}

/// Map a raw failure message to the sentence shown to the user.
///
/// First match wins.
pub fn user_safe_message(raw: &str, context: ErrorContext) -> &'static str {
    let has = |needle: &str| raw.contains(needle);
    let timed_out = has("timeout") || has("timed out");

    match context {
        ErrorContext::Tool => {
            if has("Number too large") {
                "The calculation result is too large. Please try a smaller number."
            } else if has("Invalid calculation") {
                "Invalid calculation. Please check your expression and try again."
            } else if has("Variables not allowed") {
                "Variables are not allowed in calculations. Please use numeric values only."
            } else if has("Expression too long") {
                "Expression is too long. Please simplify your calculation."
            } else if timed_out {
                "The operation timed out. Please try again."
            } else if has("Invalid") || has("parse") {
                "There was an issue with the calculation or search. Please try rephrasing your question."
            } else if has("API") {
                "A service is temporarily unavailable. Please try again later."
            } else {
                "An error occurred while processing your request"
            }
        }
        ErrorContext::Iteration => {
            if timed_out {
                "The request timed out. Please try again with a simpler question."
            } else if has("API") || has("OPENAI") {
                "The AI service is temporarily unavailable. Please try again later."
            } else if has("parse") || has("Invalid") {
                "There was an issue processing your request. Please try rephrasing your question."
            } else if has("Max iterations") {
                "The request took too long to process. Please try breaking it into smaller questions."
            } else {
                "An error occurred while processing your request. Please try again."
            }
        }
    }
}

/// Translate an error using the context it belongs to.
pub fn translate(error: &Error) -> &'static str {
    match error {
        Error::IterationLimitExceeded { .. } => ITERATION_LIMIT_APOLOGY,
        Error::Tool(tool_error) => user_safe_message(&tool_error.to_string(), ErrorContext::Tool),
        other => user_safe_message(&other.to_string(), ErrorContext::of(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentchat_core::error::{ProviderError, ToolError};

    #[test]
    fn tool_table_first_match_wins() {
        assert_eq!(
            user_safe_message("Number too large", ErrorContext::Tool),
            "The calculation result is too large. Please try a smaller number."
        );
        // "Invalid calculation" is matched before the generic "Invalid"
        assert_eq!(
            user_safe_message("Invalid calculation", ErrorContext::Tool),
            "Invalid calculation. Please check your expression and try again."
        );
        assert_eq!(
            user_safe_message("Web search timed out", ErrorContext::Tool),
            "The operation timed out. Please try again."
        );
        assert_eq!(
            user_safe_message("Tavily API error: quota", ErrorContext::Tool),
            "A service is temporarily unavailable. Please try again later."
        );
        assert_eq!(
            user_safe_message("something odd", ErrorContext::Tool),
            "An error occurred while processing your request"
        );
    }

    #[test]
    fn iteration_table() {
        assert_eq!(
            user_safe_message("Request timeout: 30s", ErrorContext::Iteration),
            "The request timed out. Please try again with a simpler question."
        );
        assert_eq!(
            user_safe_message("API request failed: boom (status: 500)", ErrorContext::Iteration),
            "The AI service is temporarily unavailable. Please try again later."
        );
        assert_eq!(
            user_safe_message("Max iterations reached (10)", ErrorContext::Iteration),
            "The request took too long to process. Please try breaking it into smaller questions."
        );
        assert_eq!(
            user_safe_message("Network error: refused", ErrorContext::Iteration),
            "An error occurred while processing your request. Please try again."
        );
    }

    #[test]
    fn translate_picks_context_from_error() {
        let parse = Error::Tool(ToolError::InvalidArguments {
            tool_name: "calculator".into(),
            reason: "EOF while parsing a string".into(),
        });
        assert_eq!(
            translate(&parse),
            "There was an issue with the calculation or search. Please try rephrasing your question."
        );

        let too_large = Error::Tool(ToolError::failed("calculator", "Number too large"));
        assert_eq!(
            translate(&too_large),
            "The calculation result is too large. Please try a smaller number."
        );

        let timeout = Error::Tool(ToolError::Timeout {
            tool_name: "web_search".into(),
            timeout_secs: 15,
        });
        assert_eq!(translate(&timeout), "The operation timed out. Please try again.");

        let provider = Error::Provider(ProviderError::ApiError {
            status_code: 503,
            message: "overloaded".into(),
        });
        assert_eq!(
            translate(&provider),
            "The AI service is temporarily unavailable. Please try again later."
        );

        assert_eq!(
            translate(&Error::IterationLimitExceeded { max_iterations: 10 }),
            ITERATION_LIMIT_APOLOGY
        );
    }

    #[test]
    fn unknown_tool_is_generic() {
        let err = Error::Tool(ToolError::NotFound("weather".into()));
        assert_eq!(
            translate(&err),
            "An error occurred while processing your request"
        );
    }
}
