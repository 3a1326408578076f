pub mod entity_hooks_route;
