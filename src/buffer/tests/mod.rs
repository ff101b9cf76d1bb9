mod tests_capacity;
