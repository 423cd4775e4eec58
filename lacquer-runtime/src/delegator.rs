//! Ordered decorator composition.
//!
//! A [`DelegatorBuilder`] collects decorator factories for one contract and
//! folds them around a base implementation. The first factory registered
//! becomes the outermost layer, so a call flows through the factories in
//! registration order before reaching the base:
//!
//! ```text
//! register(A); register(B); register(C)  =>  A(B(C(base)))
//! ```

use std::fmt;
use std::sync::Arc;

/// Wraps an implementation of `C` in one more layer.
pub type DecoratorFactory<C> = Arc<dyn Fn(Arc<C>) -> Arc<C> + Send + Sync>;

/// Mutable collection of factories around a base implementation.
pub struct DelegatorBuilder<C: ?Sized> {
    base: Arc<C>,
    factories: Vec<DecoratorFactory<C>>,
}

impl<C: ?Sized> DelegatorBuilder<C> {
    pub fn new(base: Arc<C>) -> Self {
        Self {
            base,
            factories: Vec::new(),
        }
    }

    /// Append a factory. Earlier registrations wrap later ones.
    pub fn register<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn(Arc<C>) -> Arc<C> + Send + Sync + 'static,
    {
        self.factories.push(Arc::new(factory));
        self
    }

    /// Consuming form of [`register`](Self::register).
    pub fn with<F>(mut self, factory: F) -> Self
    where
        F: Fn(Arc<C>) -> Arc<C> + Send + Sync + 'static,
    {
        self.register(factory);
        self
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Freeze the current registrations.
    ///
    /// The assembly is unaffected by later `register` calls and can be
    /// built any number of times.
    pub fn assembly(&self) -> DelegatorAssembly<C> {
        DelegatorAssembly {
            base: Arc::clone(&self.base),
            factories: self.factories.iter().cloned().collect(),
        }
    }

    /// Compose the layers. With no factories this is the base itself.
    pub fn build(&self) -> Arc<C> {
        compose(&self.base, &self.factories)
    }
}

impl<C: ?Sized> fmt::Debug for DelegatorBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatorBuilder")
            .field("factories", &self.factories.len())
            .finish()
    }
}

/// Immutable snapshot of a [`DelegatorBuilder`].
pub struct DelegatorAssembly<C: ?Sized> {
    base: Arc<C>,
    factories: Arc<[DecoratorFactory<C>]>,
}

impl<C: ?Sized> DelegatorAssembly<C> {
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn build(&self) -> Arc<C> {
        compose(&self.base, &self.factories)
    }
}

impl<C: ?Sized> Clone for DelegatorAssembly<C> {
    fn clone(&self) -> Self {
        Self {
            base: Arc::clone(&self.base),
            factories: Arc::clone(&self.factories),
        }
    }
}

impl<C: ?Sized> fmt::Debug for DelegatorAssembly<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatorAssembly")
            .field("factories", &self.factories.len())
            .finish()
    }
}

fn compose<C: ?Sized>(base: &Arc<C>, factories: &[DecoratorFactory<C>]) -> Arc<C> {
    factories
        .iter()
        .rev()
        .fold(Arc::clone(base), |inner, factory| factory(inner))
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Named: Send + Sync {
        fn name(&self) -> String;
    }

    struct Base;

    impl Named for Base {
        fn name(&self) -> String {
            "Z".to_string()
        }
    }

    struct Layer {
        tag: &'static str,
        inner: Arc<dyn Named>,
    }

    impl Named for Layer {
        fn name(&self) -> String {
            format!("{}>{}", self.tag, self.inner.name())
        }
    }

    fn layer(tag: &'static str) -> impl Fn(Arc<dyn Named>) -> Arc<dyn Named> + Send + Sync {
        move |inner| Arc::new(Layer { tag, inner }) as Arc<dyn Named>
    }

    #[test]
    fn test_first_registered_is_outermost() {
        let mut builder: DelegatorBuilder<dyn Named> = DelegatorBuilder::new(Arc::new(Base));
        builder.register(layer("A")).register(layer("B")).register(layer("C"));
        assert_eq!(builder.len(), 3);
        assert_eq!(builder.build().name(), "A>B>C>Z");
    }

    #[test]
    fn test_empty_builder_returns_base() {
        let base: Arc<dyn Named> = Arc::new(Base);
        let builder = DelegatorBuilder::new(Arc::clone(&base));
        assert!(builder.is_empty());
        assert!(Arc::ptr_eq(&builder.build(), &base));
    }

    #[test]
    fn test_assembly_is_a_snapshot() {
        let mut builder: DelegatorBuilder<dyn Named> =
            DelegatorBuilder::<dyn Named>::new(Arc::new(Base)).with(layer("A"));
        let assembly = builder.assembly();
        builder.register(layer("B"));

        assert_eq!(assembly.len(), 1);
        assert_eq!(assembly.build().name(), "A>Z");
        assert_eq!(assembly.clone().build().name(), "A>Z");
        assert_eq!(builder.build().name(), "A>B>Z");
    }
}
