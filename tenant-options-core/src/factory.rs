//! # Options Factory
//!
//! Builds a fresh options value for a `(tenant, name)` pair. Construction is
//! layered and always runs in the same order:
//!
//! 1. `T::default()`
//! 2. global setups, in registration order
//! 3. the per-tenant configurator, when a tenant is present and one was set
//! 4. post-configure callbacks, in registration order
//! 5. validators, in registration order
//!
//! Setups come in two flavours. A name-aware setup receives the name being
//! built and always runs; an unnamed setup runs only for [`DEFAULT_NAME`].
//!
//! ```
//! use tenant_options_core::{BasicTenantInfo, OptionsFactory};
//!
//! #[derive(Default)]
//! struct Smtp {
//!     host: String,
//!     port: u16,
//! }
//!
//! let factory = OptionsFactory::<Smtp, BasicTenantInfo>::builder()
//!     .configure(|o| o.host = "mail.example.com".into())
//!     .configure_all(|o| o.port = 25)
//!     .per_tenant(|o, t| o.host = format!("mail.{}", t.identifier))
//!     .build();
//!
//! let tenant = BasicTenantInfo::new("1", "acme.test");
//! let smtp = factory.create(Some(&tenant), None).unwrap();
//! assert_eq!(smtp.host, "mail.acme.test");
//! assert_eq!(smtp.port, 25);
//!
//! let backup = factory.create(None, Some("backup")).unwrap();
//! assert_eq!(backup.host, "");
//! assert_eq!(backup.port, 25);
//! ```

use crate::error::{BoxError, Error, Result};
use crate::{normalize_name, DEFAULT_NAME};
use std::fmt;
use std::sync::Arc;

type NamedSetupFn<T> = Arc<dyn Fn(&str, &mut T) -> std::result::Result<(), BoxError> + Send + Sync>;
type UnnamedSetupFn<T> = Arc<dyn Fn(&mut T) + Send + Sync>;
type TenantFn<T, I> = Arc<dyn Fn(&mut T, &I) + Send + Sync>;
type PostConfigureFn<T> = Arc<dyn Fn(&str, &mut T) + Send + Sync>;
type ValidateFn<T> = Arc<dyn Fn(&str, &T) -> std::result::Result<(), String> + Send + Sync>;

enum Setup<T> {
    /// Runs for every name.
    Named(NamedSetupFn<T>),
    /// Runs only for the default name.
    Unnamed(UnnamedSetupFn<T>),
}

impl<T> Clone for Setup<T> {
    fn clone(&self) -> Self {
        match self {
            Setup::Named(f) => Setup::Named(Arc::clone(f)),
            Setup::Unnamed(f) => Setup::Unnamed(Arc::clone(f)),
        }
    }
}

/// Builds option values through the layered setup pipeline.
///
/// `T` is the options type, `I` the tenant type handed to the per-tenant
/// configurator.
pub struct OptionsFactory<T, I> {
    setups: Vec<Setup<T>>,
    tenant_configurator: Option<TenantFn<T, I>>,
    post_configures: Vec<PostConfigureFn<T>>,
    validators: Vec<ValidateFn<T>>,
}

impl<T, I> OptionsFactory<T, I>
where
    T: Default,
{
    pub fn builder() -> OptionsFactoryBuilder<T, I> {
        OptionsFactoryBuilder::new()
    }

    /// Builds a new value for `name` and the given tenant.
    ///
    /// With no tenant the per-tenant step is skipped. Errors from fallible
    /// setups and validators are returned as-is; nothing is cached here.
    pub fn create(&self, tenant: Option<&I>, name: Option<&str>) -> Result<T> {
        let name = normalize_name(name);
        let mut options = T::default();

        for setup in &self.setups {
            match setup {
                Setup::Named(configure) => {
                    configure(name, &mut options).map_err(|source| Error::Configure {
                        name: name.to_string(),
                        source,
                    })?;
                }
                Setup::Unnamed(configure) if name == DEFAULT_NAME => configure(&mut options),
                Setup::Unnamed(_) => {}
            }
        }

        if let (Some(tenant), Some(configure)) = (tenant, &self.tenant_configurator) {
            configure(&mut options, tenant);
        }

        for post_configure in &self.post_configures {
            post_configure(name, &mut options);
        }

        let failures: Vec<String> = self
            .validators
            .iter()
            .filter_map(|validate| validate(name, &options).err())
            .collect();
        if !failures.is_empty() {
            return Err(Error::Validation {
                name: name.to_string(),
                failures,
            });
        }

        tracing::trace!(
            name,
            tenant = tenant.is_some(),
            "created options value"
        );
        Ok(options)
    }
}

impl<T, I> Clone for OptionsFactory<T, I> {
    fn clone(&self) -> Self {
        Self {
            setups: self.setups.clone(),
            tenant_configurator: self.tenant_configurator.clone(),
            post_configures: self.post_configures.clone(),
            validators: self.validators.clone(),
        }
    }
}

impl<T, I> fmt::Debug for OptionsFactory<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionsFactory")
            .field("setups", &self.setups.len())
            .field("per_tenant", &self.tenant_configurator.is_some())
            .field("post_configures", &self.post_configures.len())
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// Collects the callbacks of an [`OptionsFactory`].
///
/// Registration order is preserved within each stage.
pub struct OptionsFactoryBuilder<T, I> {
    factory: OptionsFactory<T, I>,
}

impl<T, I> OptionsFactoryBuilder<T, I> {
    fn new() -> Self {
        Self {
            factory: OptionsFactory {
                setups: Vec::new(),
                tenant_configurator: None,
                post_configures: Vec::new(),
                validators: Vec::new(),
            },
        }
    }

    /// Unnamed setup: applied only to the default-named value.
    pub fn configure<F>(mut self, configure: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.factory.setups.push(Setup::Unnamed(Arc::new(configure)));
        self
    }

    /// Name-aware setup: receives the name and always runs.
    pub fn configure_with<F>(self, configure: F) -> Self
    where
        F: Fn(&str, &mut T) + Send + Sync + 'static,
    {
        self.try_configure_with(move |name, options| {
            configure(name, options);
            Ok(())
        })
    }

    /// Fallible name-aware setup; an error aborts the build with
    /// [`Error::Configure`].
    pub fn try_configure_with<F>(mut self, configure: F) -> Self
    where
        F: Fn(&str, &mut T) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.factory.setups.push(Setup::Named(Arc::new(configure)));
        self
    }

    /// Setup targeting one name, or every name when `target` is `None`.
    pub fn configure_named<F>(self, target: Option<&str>, configure: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        let target = target.map(|t| normalize_name(Some(t)).to_string());
        self.configure_with(move |name, options| {
            if target.as_deref().map_or(true, |t| t == name) {
                configure(options);
            }
        })
    }

    /// Setup applied to every name.
    pub fn configure_all<F>(self, configure: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.configure_named(None, configure)
    }

    /// Sets the per-tenant configurator, replacing any previous one.
    ///
    /// Optional. Without it, tenant builds go straight from setup to
    /// post-configure and differ from the no-tenant value only by being
    /// cached separately.
    pub fn per_tenant<F>(mut self, configure: F) -> Self
    where
        F: Fn(&mut T, &I) + Send + Sync + 'static,
    {
        self.factory.tenant_configurator = Some(Arc::new(configure));
        self
    }

    /// Post-configure callback: runs for every name after all other setup.
    pub fn post_configure<F>(mut self, configure: F) -> Self
    where
        F: Fn(&str, &mut T) + Send + Sync + 'static,
    {
        self.factory.post_configures.push(Arc::new(configure));
        self
    }

    /// Post-configure targeting one name, or every name when `target` is `None`.
    pub fn post_configure_named<F>(self, target: Option<&str>, configure: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        let target = target.map(|t| normalize_name(Some(t)).to_string());
        self.post_configure(move |name, options| {
            if target.as_deref().map_or(true, |t| t == name) {
                configure(options);
            }
        })
    }

    /// Validator run against the finished value; `Err` messages are collected
    /// into [`Error::Validation`].
    pub fn validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&str, &T) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.factory.validators.push(Arc::new(validate));
        self
    }

    pub fn build(self) -> OptionsFactory<T, I> {
        self.factory
    }
}
