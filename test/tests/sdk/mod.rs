mod authorization_tests;
mod create2_tests;
mod linker_tests;
mod resolver_tests;
