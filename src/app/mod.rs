// Application layer: stateful services over the domain ports.

pub mod services;
