use serde::Serialize;
use serde_json::{Value, json};

/// Quiet window for the debounced resize evaluation.
pub const RESIZE_QUIET_WINDOW_MS: u64 = 100;

/// Widths at or below this are treated as mobile.
pub const MOBILE_MAX_WIDTH: u32 = 768;

/// Responsive width classes, ordered narrow to wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Xs,
    Sm,
    Md,
    Lg,
    Xl,
}

impl Breakpoint {
    /// Deterministic width mapping:
    /// `<576 → xs, <768 → sm, <992 → md, <1200 → lg, else → xl`.
    pub fn for_width(width: u32) -> Self {
        match width {
            w if w < 576 => Self::Xs,
            w if w < 768 => Self::Sm,
            w if w < 992 => Self::Md,
            w if w < 1200 => Self::Lg,
            _ => Self::Xl,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xs => "xs",
            Self::Sm => "sm",
            Self::Md => "md",
            Self::Lg => "lg",
            Self::Xl => "xl",
        }
    }
}

pub fn is_mobile_width(width: u32) -> bool {
    width <= MOBILE_MAX_WIDTH
}

/// An actual breakpoint transition. Only constructed when the settled
/// breakpoint differs from the previous one; consumers rely on never seeing
/// a same-value notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointChange {
    /// `None` only for the first evaluated transition after a generation
    /// started without a primed breakpoint.
    pub from: Option<Breakpoint>,
    pub to: Breakpoint,
    pub width: u32,
    pub is_mobile: bool,
}

impl BreakpointChange {
    pub fn to_payload(&self) -> Value {
        json!({
            "from": self.from.map(|b| b.as_str()),
            "to": self.to.as_str(),
            "width": self.width,
            "is_mobile": self.is_mobile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_thresholds_are_exact() {
        assert_eq!(Breakpoint::for_width(0), Breakpoint::Xs);
        assert_eq!(Breakpoint::for_width(575), Breakpoint::Xs);
        assert_eq!(Breakpoint::for_width(576), Breakpoint::Sm);
        assert_eq!(Breakpoint::for_width(767), Breakpoint::Sm);
        assert_eq!(Breakpoint::for_width(768), Breakpoint::Md);
        assert_eq!(Breakpoint::for_width(991), Breakpoint::Md);
        assert_eq!(Breakpoint::for_width(992), Breakpoint::Lg);
        assert_eq!(Breakpoint::for_width(1199), Breakpoint::Lg);
        assert_eq!(Breakpoint::for_width(1200), Breakpoint::Xl);
    }

    #[test]
    fn mobile_flag_includes_the_boundary() {
        assert!(is_mobile_width(320));
        assert!(is_mobile_width(768));
        assert!(!is_mobile_width(769));
    }

    #[test]
    fn change_payload_shape() {
        let change = BreakpointChange {
            from: Some(Breakpoint::Xs),
            to: Breakpoint::Md,
            width: 800,
            is_mobile: false,
        };
        assert_eq!(
            change.to_payload(),
            json!({ "from": "xs", "to": "md", "width": 800, "is_mobile": false })
        );
    }
}
