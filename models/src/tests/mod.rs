mod server_record;
