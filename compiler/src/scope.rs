// scope.rs — Lexically scoped name bindings
//
// A scope is a persistent chain: `push` returns a new child that borrows its
// parent, so a binding is visible exactly as long as the child value lives.
// Leaving a construct is just dropping the child; no explicit pop exists.

/// A parent-linked chain of `(name, value)` bindings.
#[derive(Debug)]
pub struct Scope<'p, T> {
    parent: Option<&'p Scope<'p, T>>,
    binding: Option<(String, T)>,
}

impl<T> Default for Scope<'_, T> {
    fn default() -> Self {
        Scope::root()
    }
}

impl<'p, T> Scope<'p, T> {
    /// The empty scope.
    pub fn root() -> Self {
        Scope {
            parent: None,
            binding: None,
        }
    }

    /// A child scope that additionally binds `name`, shadowing outer bindings.
    pub fn push<'c>(&'c self, name: impl Into<String>, value: T) -> Scope<'c, T> {
        Scope {
            parent: Some(self),
            binding: Some((name.into(), value)),
        }
    }

    /// Innermost binding for `name`.
    pub fn get(&self, name: &str) -> Option<&T> {
        let mut cur = Some(self);
        while let Some(scope) = cur {
            if let Some((n, v)) = &scope.binding {
                if n == name {
                    return Some(v);
                }
            }
            cur = scope.parent;
        }
        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}
