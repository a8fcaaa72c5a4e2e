mod stale;

pub use self::stale::StaleCache;
