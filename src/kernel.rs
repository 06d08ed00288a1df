// Kernel functions for KDE mesh tallies
use std::collections::HashMap;
use std::fmt;

use tracing::warn;

/// Name of the kernel used when none (or an unknown one) is requested.
pub const DEFAULT_KERNEL: &str = "epanechnikov";

/// A one-dimensional smoothing function.
///
/// The 3D kernel is separable: each axis evaluates `evaluate` independently
/// on its own distance ratio and the results are multiplied together.
pub trait Kernel: fmt::Debug + Send + Sync {
    /// Kernel weight at distance ratio `u = (x - X) / h`. Never negative.
    fn evaluate(&self, u: f64) -> f64;

    fn name(&self) -> &str;
}

/// Second-order symmetric polynomial kernel `c_k (1 - u^2)^k` on [-1, 1].
///
/// | k | name |
/// |---|---|
/// | 0 | uniform |
/// | 1 | epanechnikov |
/// | 2 | biweight |
/// | 3 | triweight |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolynomialKernel {
    power: u32,
    normalization: f64,
    name: &'static str,
}

impl PolynomialKernel {
    pub fn uniform() -> Self {
        Self { power: 0, normalization: 0.5, name: "uniform" }
    }

    pub fn epanechnikov() -> Self {
        Self { power: 1, normalization: 0.75, name: "epanechnikov" }
    }

    pub fn biweight() -> Self {
        Self { power: 2, normalization: 15.0 / 16.0, name: "biweight" }
    }

    pub fn triweight() -> Self {
        Self { power: 3, normalization: 35.0 / 32.0, name: "triweight" }
    }
}

impl Kernel for PolynomialKernel {
    #[inline]
    fn evaluate(&self, u: f64) -> f64 {
        if !(-1.0..=1.0).contains(&u) {
            return 0.0;
        }
        self.normalization * (1.0 - u * u).powi(self.power as i32)
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Factory producing a fresh kernel object
pub type KernelFactory = fn() -> Box<dyn Kernel>;

/// Maps kernel names to factories so new kernels can be added without
/// touching the estimators.
#[derive(Clone)]
pub struct KernelRegistry {
    factories: HashMap<String, KernelFactory>,
}

impl KernelRegistry {
    /// Create an empty registry
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a kernel factory; an existing entry with the same name is replaced.
    pub fn register(&mut self, name: &str, factory: KernelFactory) {
        self.factories.insert(name.to_lowercase(), factory);
    }

    /// Create a kernel by name (case insensitive)
    pub fn create(&self, name: &str) -> Option<Box<dyn Kernel>> {
        self.factories.get(&name.to_lowercase()).map(|factory| factory())
    }

    /// Create a kernel by name, falling back to the default kernel with a
    /// warning if the name is not registered.
    pub fn create_or_default(&self, name: &str) -> Box<dyn Kernel> {
        match self.create(name) {
            Some(kernel) => kernel,
            None => {
                warn!(
                    kernel = name,
                    fallback = DEFAULT_KERNEL,
                    "unknown kernel type, using default"
                );
                Box::new(PolynomialKernel::epanechnikov())
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_lowercase())
    }

    /// Sorted list of registered kernel names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for KernelRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("uniform", || Box::new(PolynomialKernel::uniform()));
        registry.register("epanechnikov", || Box::new(PolynomialKernel::epanechnikov()));
        registry.register("biweight", || Box::new(PolynomialKernel::biweight()));
        registry.register("triweight", || Box::new(PolynomialKernel::triweight()));
        registry
    }
}

impl fmt::Debug for KernelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelRegistry")
            .field("kernels", &self.names())
            .finish()
    }
}
