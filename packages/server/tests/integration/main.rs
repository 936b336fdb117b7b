mod cleanup;
mod gc;
mod orphans;
