use crate::client::store::ClientState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    RequiresAuth,
    GuestOnly,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Stations,
    Map,
    NotFound,
}

impl Route {
    pub const ALL: [Route; 6] = [
        Route::Home,
        Route::Login,
        Route::Register,
        Route::Stations,
        Route::Map,
        Route::NotFound,
    ];

    /// `None` for the catch-all route.
    pub fn path(self) -> Option<&'static str> {
        match self {
            Route::Home => Some("/"),
            Route::Login => Some("/login"),
            Route::Register => Some("/register"),
            Route::Stations => Some("/stations"),
            Route::Map => Some("/map"),
            Route::NotFound => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Login => "Login",
            Route::Register => "Register",
            Route::Stations => "Stations",
            Route::Map => "Map",
            Route::NotFound => "NotFound",
        }
    }

    pub fn access(self) -> RouteAccess {
        match self {
            Route::Home | Route::Stations | Route::Map => RouteAccess::RequiresAuth,
            Route::Login | Route::Register => RouteAccess::GuestOnly,
            Route::NotFound => RouteAccess::Public,
        }
    }

    /// Unknown paths resolve to [`Route::NotFound`]. A trailing slash and a
    /// query string are ignored.
    pub fn from_path(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };

        Route::ALL
            .into_iter()
            .find(|route| route.path() == Some(normalized))
            .unwrap_or(Route::NotFound)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Proceed(Route),
    Redirect(Route),
}

impl Navigation {
    pub fn destination(self) -> Route {
        match self {
            Navigation::Proceed(route) | Navigation::Redirect(route) => route,
        }
    }
}

/// Evaluated before every navigation.
pub fn guard(target: Route, authenticated: bool) -> Navigation {
    match (target.access(), authenticated) {
        (RouteAccess::RequiresAuth, false) => Navigation::Redirect(Route::Login),
        (RouteAccess::GuestOnly, true) => Navigation::Redirect(Route::Home),
        _ => Navigation::Proceed(target),
    }
}

#[derive(Debug, Default)]
pub struct Router {
    current: Option<Route>,
}

impl Router {
    pub fn current(&self) -> Option<Route> {
        self.current
    }

    pub fn navigate(&mut self, target: Route, state: &ClientState) -> Navigation {
        let outcome = guard(target, state.is_authenticated());
        if let Navigation::Redirect(to) = outcome {
            tracing::debug!(from = target.name(), to = to.name(), "navigation redirected");
        }
        self.current = Some(outcome.destination());
        outcome
    }
}
