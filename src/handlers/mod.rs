pub mod navigation;

pub use navigation::NavigationHandler;
