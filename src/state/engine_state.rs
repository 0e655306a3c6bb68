/// Lifecycle states of the crawl engine
///
/// The engine starts in `Init`, works through locales one at a time in `LocaleActive`,
/// and ends in exactly one `Done` state. Locales are only ever visited in forward order.
use std::fmt;

/// Why a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoneReason {
    /// Every locale's frontier was exhausted
    Completed,

    /// The stored page count reached the configured maximum
    LimitReached,

    /// A shutdown signal stopped the crawl
    Interrupted,
}

impl DoneReason {
    /// Returns true if the crawl can be resumed from its checkpoint
    pub fn is_resumable(&self) -> bool {
        !matches!(self, Self::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::LimitReached => "limit_reached",
            Self::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for DoneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents the current phase of the crawl engine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EngineState {
    // ===== Active States =====
    /// Engine constructed, no locale started yet
    Init,

    /// Engine is crawling the named locale
    LocaleActive(String),

    // ===== Terminal States =====
    /// Engine finished for the given reason
    Done(DoneReason),
}

impl EngineState {
    /// Returns true if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Returns true if the engine may move from this state to `next`
    ///
    /// `locales` gives the crawl's locale order, which locale-to-locale moves must respect.
    pub fn can_transition_to(&self, next: &EngineState, locales: &[String]) -> bool {
        match (self, next) {
            (Self::Done(_), _) => false,
            (Self::Init, Self::LocaleActive(_)) => true,
            (Self::Init, Self::Done(_)) => true,
            (Self::LocaleActive(current), Self::LocaleActive(following)) => {
                let position = |name: &str| locales.iter().position(|l| l == name);
                match (position(current), position(following)) {
                    (Some(a), Some(b)) => b > a,
                    _ => false,
                }
            }
            (Self::LocaleActive(_), Self::Done(_)) => true,
            (_, Self::Init) => false,
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::LocaleActive(locale) => write!(f, "locale_active({})", locale),
            Self::Done(reason) => write!(f, "done({})", reason),
        }
    }
}
