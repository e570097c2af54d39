//! Behaviour tests spanning the loader, service and lifecycle.

mod support;
