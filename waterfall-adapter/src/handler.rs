use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use waterfall::LoadRequest;

/// What a [`LoadHandler`] did with a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dispatch {
    /// The handler took the request and will answer it via `Controller::complete`.
    Accepted,
    /// Nobody can serve the request; the controller treats it as `has_more = false`.
    Unhandled,
}

/// The external data source behind load requests.
///
/// Accepting a request obliges the host to call `Controller::complete(request.ticket, ..)`
/// exactly once, after the new items were appended and ingested.
pub trait LoadHandler {
    fn load_more(&mut self, request: LoadRequest) -> Dispatch;
}

impl<F: FnMut(LoadRequest)> LoadHandler for F {
    fn load_more(&mut self, request: LoadRequest) -> Dispatch {
        self(request);
        Dispatch::Accepted
    }
}

type NamedCallback = Box<dyn FnMut(LoadRequest) + Send>;

/// Name-based callback lookup kept for hosts that configure their loader by name.
///
/// The registry is a [`LoadHandler`] bound to one configured name: requests go to the callback
/// registered under that name, or come back [`Dispatch::Unhandled`] when there is none.
#[derive(Default)]
pub struct CallbackRegistry {
    selected: Option<String>,
    callbacks: Vec<(String, NamedCallback)>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the callback for `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        f: impl FnMut(LoadRequest) + Send + 'static,
    ) {
        let name = name.into();
        let f: NamedCallback = Box::new(f);
        match self.callbacks.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = f,
            None => self.callbacks.push((name, f)),
        }
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(n, _)| n != name);
        self.callbacks.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.callbacks.iter().any(|(n, _)| n == name)
    }

    /// Selects which registered name receives requests.
    pub fn select(&mut self, name: Option<impl Into<String>>) {
        self.selected = name.map(Into::into);
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }
}

impl LoadHandler for CallbackRegistry {
    fn load_more(&mut self, request: LoadRequest) -> Dispatch {
        let Some(name) = self.selected.as_deref() else {
            return Dispatch::Unhandled;
        };
        match self.callbacks.iter_mut().find(|(n, _)| n == name) {
            Some((_, f)) => {
                f(request);
                Dispatch::Accepted
            }
            None => {
                wwarn!(name, "no load callback registered under this name");
                Dispatch::Unhandled
            }
        }
    }
}

impl core::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("selected", &self.selected)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
