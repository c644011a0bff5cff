pub mod instances;

use catalog_db::Database;
use catalog_kernel::ModuleRegistry;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, db: &Database) {
    registry.register(instances::create_module(db));
}
