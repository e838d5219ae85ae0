mod compare_tests;
mod property_tests;
mod system_tests;
