mod test_candidate_order;
mod test_failure_isolation;
