use crate::routes;

/// Navigation the calling layer must perform after a dispatch.
///
/// The dispatcher never touches the environment itself; it reports what a
/// status code implies and the caller executes it through an [`EffectSink`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NavigationEffect {
    #[default]
    None,
    RedirectTo(String),
    /// Sign the current session out, then redirect.
    SignOut { then: String },
}

/// Executes navigation effects in the calling layer.
pub trait EffectSink {
    fn sign_out(&mut self);
    fn redirect(&mut self, path: &str);
}

impl NavigationEffect {
    pub fn is_none(&self) -> bool { matches!(self, NavigationEffect::None) }

    /// Redirect target, if the effect navigates anywhere.
    pub fn target(&self) -> Option<&str> {
        match self {
            NavigationEffect::None => None,
            NavigationEffect::RedirectTo(p) | NavigationEffect::SignOut { then: p } => Some(p.as_str()),
        }
    }

    pub fn apply<S: EffectSink + ?Sized>(&self, sink: &mut S) {
        match self {
            NavigationEffect::None => {}
            NavigationEffect::RedirectTo(path) => sink.redirect(path),
            NavigationEffect::SignOut { then } => {
                sink.sign_out();
                sink.redirect(then);
            }
        }
    }
}

/// Map a response status (or its absence) to the navigation it triggers.
pub fn classify(status: Option<u16>) -> NavigationEffect {
    match status {
        None => NavigationEffect::RedirectTo(routes::SERVER_ERROR.to_string()),
        Some(401) => NavigationEffect::SignOut { then: routes::LOGIN.to_string() },
        Some(403) => NavigationEffect::RedirectTo(routes::FORBIDDEN.to_string()),
        Some(500..=599) => NavigationEffect::RedirectTo(routes::SERVER_ERROR.to_string()),
        Some(_) => NavigationEffect::None,
    }
}
