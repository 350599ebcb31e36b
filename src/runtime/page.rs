/// Closed set of recognized page types, classified once per lifecycle
/// generation from the body class markers the templates stamp on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageContext {
    Home,
    VideoSingle,
    Performers,
    Login,
    Register,
    LikedVideos,
    ShortVideos,
    Archive,
    Search,
    #[default]
    Default,
}

/// Marker → context table. Classification walks it in order, so when a page
/// carries several recognized markers the earlier entry wins.
const MARKERS: &[(&str, PageContext)] = &[
    ("home", PageContext::Home),
    ("single-video", PageContext::VideoSingle),
    ("performers", PageContext::Performers),
    ("login", PageContext::Login),
    ("register", PageContext::Register),
    ("liked-videos", PageContext::LikedVideos),
    ("short-videos", PageContext::ShortVideos),
    ("archive", PageContext::Archive),
    ("search", PageContext::Search),
];

impl PageContext {
    pub fn classify(body_classes: &[String]) -> Self {
        for (marker, context) in MARKERS {
            if body_classes.iter().any(|class| class == marker) {
                return *context;
            }
        }
        Self::Default
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::VideoSingle => "video-single",
            Self::Performers => "performers",
            Self::Login => "login",
            Self::Register => "register",
            Self::LikedVideos => "liked-videos",
            Self::ShortVideos => "short-videos",
            Self::Archive => "archive",
            Self::Search => "search",
            Self::Default => "default",
        }
    }
}
