mod tests_fanout;
