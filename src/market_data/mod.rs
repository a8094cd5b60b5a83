// Market data module entrypoint
pub mod adapters;    // venue-specific payload layouts (Gemini, Coinbase)
pub mod clock;       // time source for throttling + backoff
pub mod error;       // fetch-layer error taxonomy
pub mod governor;    // per-endpoint admission control
pub mod normaliser;  // converts wire strings -> decimals
pub mod retry;       // exponential backoff around a single fetch
pub mod router;      // orchestrates everything for one quote
pub mod transport;   // raw HTTP GET
