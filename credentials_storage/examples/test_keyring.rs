use credentials_storage::{delete_token, load_token, store_token, AuthToken};

fn main() {
    println!("=== Testing login token storage ===\n");

    let token = AuthToken {
        token_type: "bearer".to_string(),
        access_token: "TEST_ACCESS_TOKEN_123".to_string(),
    };

    println!("1. Storing token...");
    if let Err(e) = store_token(&token) {
        println!("   Failed: {}\n", e);
        return;
    }
    println!("   Stored\n");

    println!("2. Loading token...");
    match load_token() {
        Ok(loaded) => {
            println!("   Authorization: {}", loaded.header_value());
            println!("   Matches: {}\n", loaded == token);
        }
        Err(e) => println!("   Failed: {}\n", e),
    }

    println!("3. Cleaning up...");
    match delete_token() {
        Ok(_) => println!("   Deleted"),
        Err(e) => println!("   Failed to delete: {}", e),
    }
}
