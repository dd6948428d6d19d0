//! `lxcdrv version`: Print the driver name.

use lxcdrv_runtime::driver::Driver;

/// Executes the `version` command.
pub fn execute(driver: &Driver) {
    println!("{} ({})", driver.name(), env!("CARGO_PKG_VERSION"));
}
