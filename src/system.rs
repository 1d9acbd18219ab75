use crate::reference::ReferenceResolver;

/// Per-invocation handle handed to upgrade steps by the caller
#[derive(Clone, Copy)]
pub struct SystemContext<'a> {
    resolver: &'a dyn ReferenceResolver,
}

impl<'a> SystemContext<'a> {
    pub fn new(resolver: &'a dyn ReferenceResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &'a dyn ReferenceResolver {
        self.resolver
    }
}
