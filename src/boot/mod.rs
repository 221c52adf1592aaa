use serde::{Deserialize, Serialize};

#[cfg(feature = "cortex_m")]
pub mod cortex_m;

/// Cores to (re)start once an image has been registered.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Cores {
    All,
    Single(u8),
}

/// What happens after a validated image is registered.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum BootFlow {
    /// Restart all application cores into the registered image.
    #[default]
    RestartCores,
    /// Hand over to [`Launch::custom_boot_flow`].
    Custom,
}

/// Launch mechanism that takes over a validated image.
///
/// Once registered, the memory of the image belongs to the launcher.
pub trait Launch {
    type Error: core::fmt::Debug;

    /// Record the validated image for the launch phase.
    ///
    /// Never called with an image which did not pass validation.
    fn register_boot_image(&mut self, image: &[u8]);

    fn restart_cores(&mut self, cores: Cores) -> Result<(), Self::Error>;

    /// Board specific boot flow replacing the core restart.
    fn custom_boot_flow(&mut self) -> Result<(), Self::Error> {
        self.restart_cores(Cores::All)
    }
}
