//! Shared test fakes and end-to-end sweep tests.
