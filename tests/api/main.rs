mod helpers;
mod send;
mod test_send;
mod view;
