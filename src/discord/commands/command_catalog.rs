// Discord commands module.
// Each feature gets its own command file.

pub mod citizenship;

pub mod legislature;

pub mod elections;

pub mod corporations;

pub mod statutes;
