mod confirmation_tests;
mod mock;
mod wallet_tests;
