mod ratings;
mod users;
