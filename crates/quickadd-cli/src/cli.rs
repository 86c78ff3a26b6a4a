//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

/// quickadd - list upcoming calendar events and add one from free text
///
/// With no words, only lists upcoming events. With words, lists events and
/// then creates an event from the words, e.g.:
///
/// ```text
/// quickadd Dinner tomorrow at 10
/// ```
#[derive(Debug, Parser)]
#[command(name = "quickadd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "QUICKADD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Path to the OAuth client-secret JSON file
    #[arg(long, env = "QUICKADD_CREDENTIALS_FILE")]
    pub credentials_file: Option<PathBuf>,

    /// Path to the persisted token file
    #[arg(long, env = "QUICKADD_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Maximum number of upcoming events to list
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Free-text event description, interpreted by the calendar service
    pub words: Vec<String>,
}

/// Joins the event words into the quick-add text.
///
/// Words are joined with single spaces and sent verbatim. An empty word
/// list produces the empty string, meaning no quick-add was requested.
pub fn compose_text(words: &[String]) -> String {
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(input: &[&str]) -> Vec<String> {
        input.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn compose_joins_with_single_spaces() {
        let text = compose_text(&words(&["Dinner", "tomorrow", "at", "10"]));
        assert_eq!(text, "Dinner tomorrow at 10");
    }

    #[test]
    fn compose_single_word() {
        assert_eq!(compose_text(&words(&["Standup"])), "Standup");
    }

    #[test]
    fn compose_empty_means_no_quick_add() {
        assert_eq!(compose_text(&[]), "");
    }

    #[test]
    fn compose_has_no_leading_or_trailing_space() {
        let text = compose_text(&words(&["a", "b"]));
        assert!(!text.starts_with(' '));
        assert!(!text.ends_with(' '));
    }

    #[test]
    fn compose_preserves_word_contents() {
        // No escaping or normalization: words go through untouched.
        let text = compose_text(&words(&["Café", "9:30-10:00", "w/ \"team\""]));
        assert_eq!(text, "Café 9:30-10:00 w/ \"team\"");
    }

    #[test]
    fn parse_bare_words() {
        let cli = Cli::try_parse_from(["quickadd", "Dinner", "tomorrow", "at", "10"]).unwrap();
        assert_eq!(
            cli.words,
            words(&["Dinner", "tomorrow", "at", "10"])
        );
        assert!(!cli.debug);
        assert!(cli.config.is_none());
    }

    #[test]
    fn parse_no_words_is_list_only() {
        let cli = Cli::try_parse_from(["quickadd"]).unwrap();
        assert!(cli.words.is_empty());
    }

    #[test]
    fn parse_options_before_words() {
        let cli = Cli::try_parse_from([
            "quickadd",
            "-v",
            "--max-results",
            "5",
            "Lunch",
            "friday",
        ])
        .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.max_results, Some(5));
        assert_eq!(cli.words, words(&["Lunch", "friday"]));
    }
}
